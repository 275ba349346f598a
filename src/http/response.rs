//! Response handling.
//!
//! # Responsibilities
//! - Buffer what handlers write through the context (status, headers, body)
//! - Track whether the response has been committed
//! - Render the canonical JSON error bodies
//!
//! # Design Decisions
//! - The first status write commits the response; later status writes are
//!   ignored with a warning, never applied twice
//! - Body writes on an uncommitted response commit it with 200
//! - A pre-built response (e.g. from the static file service) replaces the
//!   buffered body but keeps headers set earlier in the chain
//! - Every error body is `{"message": ...}`

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// JSON body used for every router-generated error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Render `{"message": message}` with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

/// 404 for paths no route matches.
pub fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "not found")
}

/// Generic 500. Failure details stay in the logs.
pub fn server_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "server error")
}

/// Per-request response buffer owned by the [`Context`](crate::http::Context).
#[derive(Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    prebuilt: Option<Response>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a status has been written.
    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    /// The committed status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Commit the status. Returns false (and changes nothing) if the response
    /// was already committed.
    pub fn write_header(&mut self, status: StatusCode) -> bool {
        if let Some(current) = self.status {
            tracing::warn!(
                current = %current,
                ignored = %status,
                "Superfluous status write ignored"
            );
            return false;
        }
        self.status = Some(status);
        true
    }

    /// Append to the body, committing 200 first if nothing was committed yet.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        if self.prebuilt.is_some() {
            tracing::warn!(len = bytes.len(), "Body write after a full response was sent, ignored");
            return;
        }
        self.body.extend_from_slice(bytes);
    }

    /// Replace a header. Ignored once committed.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.guard_headers(&name) {
            self.headers.insert(name, value);
            true
        } else {
            false
        }
    }

    /// Add a header value, keeping existing ones. Ignored once committed.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.guard_headers(&name) {
            self.headers.append(name, value);
            true
        } else {
            false
        }
    }

    /// Use a complete response as-is. Returns false if already committed.
    pub fn send(&mut self, response: Response) -> bool {
        if !self.write_header(response.status()) {
            return false;
        }
        self.prebuilt = Some(response);
        true
    }

    /// Build the final response. Uncommitted writers produce an empty 200.
    pub fn into_response(self) -> Response {
        if let Some(mut response) = self.prebuilt {
            for name in self.headers.keys() {
                if response.headers().contains_key(name) {
                    continue;
                }
                for value in self.headers.get_all(name) {
                    response.headers_mut().append(name.clone(), value.clone());
                }
            }
            return response;
        }

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }

    fn guard_headers(&self, name: &HeaderName) -> bool {
        if self.is_committed() {
            tracing::warn!(header = %name, "Header change after response was committed, ignored");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_error_bodies() {
        let res = not_found();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_string(res).await, r#"{"message":"not found"}"#);

        let res = server_error();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(res).await, r#"{"message":"server error"}"#);
    }

    #[test]
    fn test_status_commits_once() {
        let mut writer = ResponseWriter::new();
        assert!(!writer.is_committed());
        assert!(writer.write_header(StatusCode::CREATED));
        assert!(!writer.write_header(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(writer.status(), Some(StatusCode::CREATED));
    }

    #[tokio::test]
    async fn test_write_commits_ok_and_appends() {
        let mut writer = ResponseWriter::new();
        writer.write(b"hello ");
        writer.write(b"world");
        assert_eq!(writer.status(), Some(StatusCode::OK));
        assert_eq!(body_string(writer.into_response()).await, "hello world");
    }

    #[test]
    fn test_headers_frozen_after_commit() {
        let mut writer = ResponseWriter::new();
        assert!(writer.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain")));
        writer.write_header(StatusCode::OK);
        assert!(!writer.set_header(CONTENT_TYPE, HeaderValue::from_static("text/html")));
        assert_eq!(writer.headers()[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_prebuilt_keeps_earlier_headers() {
        let mut writer = ResponseWriter::new();
        writer.set_header(
            HeaderName::from_static("x-trace"),
            HeaderValue::from_static("abc"),
        );
        let prebuilt = (StatusCode::ACCEPTED, "done").into_response();
        assert!(writer.send(prebuilt));
        assert!(!writer.send(StatusCode::OK.into_response()));

        let res = writer.into_response();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert_eq!(res.headers()["x-trace"], "abc");
    }

    #[test]
    fn test_uncommitted_is_empty_ok() {
        let res = ResponseWriter::new().into_response();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
