//! Per-request context.
//!
//! # Responsibilities
//! - Own the incoming request and the response being written
//! - Expose the path parameters of the matched route
//! - Carry request-scoped state between middleware and the handler
//! - Provide body binding and response writers for handlers
//!
//! # Design Decisions
//! - Created fresh for every request and never shared across requests
//! - State values are typed (`Any`), looked up by string key
//! - Writers go through [`ResponseWriter`], which tracks commitment so the
//!   dispatcher never writes a second response

use std::any::Any;
use std::collections::HashMap;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri};
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::http::handler::{HandlerError, HandlerResult};
use crate::http::response::ResponseWriter;
use crate::routing::Params;

/// Largest body [`Context::bind`] will buffer.
pub const BIND_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Request context handed to middleware and handlers.
pub struct Context {
    request: Request<Body>,
    response: ResponseWriter,
    params: Params,
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
    /// Parsed form body, filled on first use.
    form: Option<Vec<(String, String)>>,
}

impl Context {
    pub fn new(request: Request<Body>, params: Params) -> Self {
        Self {
            request,
            response: ResponseWriter::new(),
            params,
            values: HashMap::new(),
            form: None,
        }
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// Raw (still percent-encoded) request path.
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn request(&self) -> &Request<Body> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Body> {
        &mut self.request
    }

    /// Take the request body, leaving an empty one behind.
    pub fn take_body(&mut self) -> Body {
        std::mem::take(self.request.body_mut())
    }

    /// Path parameter bound by the matched route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// First query-string value for `name`, form-urlencoded decoded.
    pub fn query(&self, name: &str) -> Option<String> {
        let query = self.request.uri().query()?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).ok()?;
        pairs.into_iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    /// Store a request-scoped value, replacing any previous value for `key`.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Look up a value stored with [`Context::set`]. Returns `None` if the key
    /// is missing or holds a different type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref()
    }

    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        let value = self.values.remove(key)?;
        value.downcast::<T>().ok().map(|boxed| *boxed)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Decode the request into `T`.
    ///
    /// The body is decoded first: JSON for `application/json`, form fields
    /// for `application/x-www-form-urlencoded`, nothing otherwise. Query
    /// values are laid over it, then route parameters, so a later source
    /// replaces a field set by an earlier one. In a JSON body the overlaid
    /// values arrive as strings.
    pub async fn bind<T: DeserializeOwned>(&mut self) -> Result<T, HandlerError> {
        let content_type = self.content_type();
        let url_values = self.url_values();

        if content_type.starts_with("application/json") {
            let bytes = axum::body::to_bytes(self.take_body(), BIND_BODY_LIMIT).await?;
            let mut value = if bytes.is_empty() {
                serde_json::Value::Object(serde_json::Map::new())
            } else {
                serde_json::from_slice(&bytes)?
            };
            if let serde_json::Value::Object(fields) = &mut value {
                for (key, val) in url_values {
                    fields.insert(key, serde_json::Value::String(val));
                }
            }
            return Ok(serde_json::from_value(value)?);
        }

        let mut pairs = if content_type.starts_with("application/x-www-form-urlencoded") {
            self.form_pairs().await?.to_vec()
        } else {
            Vec::new()
        };
        for (key, val) in url_values {
            overlay(&mut pairs, key, val);
        }
        let encoded = serde_urlencoded::to_string(&pairs)?;
        Ok(serde_urlencoded::from_str(&encoded)?)
    }

    /// Value of form field `name`: from a form body when there is one,
    /// otherwise (or when the body lacks it) from the query string.
    pub async fn form_value(&mut self, name: &str) -> Result<Option<String>, HandlerError> {
        if self.content_type().starts_with("application/x-www-form-urlencoded") {
            let found = self
                .form_pairs()
                .await?
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone());
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(self.query(name))
    }

    fn content_type(&self) -> String {
        self.headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// Query pairs followed by route parameters, last value per key.
    fn url_values(&self) -> Vec<(String, String)> {
        let mut values = Vec::new();
        let query = self.uri().query().unwrap_or_default();
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
        for (key, val) in pairs {
            overlay(&mut values, key, val);
        }
        for (key, val) in &self.params {
            overlay(&mut values, key.clone(), val.clone());
        }
        values
    }

    /// Form body pairs, read and parsed once.
    async fn form_pairs(&mut self) -> Result<&[(String, String)], HandlerError> {
        if self.form.is_none() {
            let bytes = axum::body::to_bytes(self.take_body(), BIND_BODY_LIMIT).await?;
            self.form = Some(serde_urlencoded::from_bytes(&bytes)?);
        }
        Ok(self.form.as_deref().unwrap_or_default())
    }

    /// Write `value` as indented JSON.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> HandlerResult {
        let body = serde_json::to_vec_pretty(value)?;
        self.response
            .set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.response.write_header(status);
        self.response.write(&body);
        Ok(())
    }

    /// Write a plain-text body.
    pub fn string(&mut self, status: StatusCode, value: impl AsRef<str>) -> HandlerResult {
        self.response
            .set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        self.response.write_header(status);
        self.response.write(value.as_ref().as_bytes());
        Ok(())
    }

    /// Respond with a status and no body.
    pub fn none(&mut self, status: StatusCode) -> HandlerResult {
        self.response.write_header(status);
        Ok(())
    }

    pub fn status(&mut self, status: StatusCode) {
        self.response.write_header(status);
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.response.write(bytes);
    }

    /// Respond with a fully built response.
    pub fn send(&mut self, response: Response) {
        self.response.send(response);
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> HandlerResult {
        let (name, value) = parse_header(name, value)?;
        self.response.set_header(name, value);
        Ok(())
    }

    pub fn add_header(&mut self, name: &str, value: &str) -> HandlerResult {
        let (name, value) = parse_header(name, value)?;
        self.response.append_header(name, value);
        Ok(())
    }

    /// Add a `Set-Cookie` header. `cookie` is the serialized cookie, e.g.
    /// `session=abc; Path=/; HttpOnly`.
    pub fn set_cookie(&mut self, cookie: &str) -> HandlerResult {
        let value = HeaderValue::from_str(cookie).map_err(HandlerError::internal)?;
        self.response.append_header(SET_COOKIE, value);
        Ok(())
    }

    pub fn is_committed(&self) -> bool {
        self.response.is_committed()
    }

    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    pub fn into_response(self) -> Response {
        self.response.into_response()
    }
}

fn overlay(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    pairs.retain(|(k, _)| *k != key);
    pairs.push((key, value));
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), HandlerError> {
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(HandlerError::internal)?;
    let value = HeaderValue::from_str(value).map_err(HandlerError::internal)?;
    Ok((name, value))
}
