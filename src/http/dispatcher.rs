//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! Request
//!     → Scanning: resolve (method, decoded path) on the table snapshot
//!         → no match: 404 {"message": "not found"}
//!     → Matched: fresh Context with the route parameters
//!     → Running: composed chain (middleware, then handler)
//!     → Responding:
//!         Ok                  → whatever the chain wrote (empty 200 if nothing)
//!         Err(Abort)          → its status + {"message": ...}
//!         Err(Internal)/panic → 500 {"message": "server error"}
//!         already committed   → committed response kept, nothing rewritten
//! ```
//!
//! # Design Decisions
//! - Every per-request failure ends as a response; nothing escapes the task
//! - Internal error details go to the log, never to the client
//! - One table snapshot per request, so concurrent registrations never
//!   change a lookup half-way

use std::any::Any;
use std::borrow::Cow;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::FutureExt;

use crate::http::context::Context;
use crate::http::handler::HandlerError;
use crate::http::request::request_id;
use crate::http::response;
use crate::observability::metrics;
use crate::routing::{RouteMatch, SharedRoutes};

/// Label used in metrics for requests that matched no route.
const UNMATCHED_ROUTE: &str = "none";

/// Routes every request through the shared table.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    routes: SharedRoutes,
}

impl Dispatcher {
    pub fn new(routes: SharedRoutes) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &SharedRoutes {
        &self.routes
    }

    /// Handle one request end to end.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let request_id = request_id(request.headers()).to_string();
        let path = decode_path(request.uri().path()).into_owned();

        let resolved = self.routes.snapshot().resolve(&method, &path);
        let Some(RouteMatch { entry, params }) = resolved else {
            tracing::debug!(
                request_id = %request_id,
                method = %method,
                path = %path,
                "No route matched"
            );
            metrics::record_request(method.as_str(), 404, UNMATCHED_ROUTE, start);
            return response::not_found();
        };

        let route = entry.pattern().as_str();
        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            route = %route,
            "Route matched"
        );

        let mut ctx = Context::new(request, params);
        let outcome = AssertUnwindSafe(entry.chain().call(&mut ctx))
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(
                    request_id = %request_id,
                    route = %route,
                    panic = %message,
                    "Handler panicked"
                );
                Some(HandlerError::internal(format!("handler panicked: {message}")))
            }
        };

        let response = match failure {
            None => ctx.into_response(),
            Some(err) => recover(ctx, err, &request_id, route),
        };

        metrics::record_request(method.as_str(), response.status().as_u16(), route, start);
        response
    }
}

/// Turn a chain failure into the final response.
fn recover(ctx: Context, err: HandlerError, request_id: &str, route: &str) -> Response {
    match &err {
        HandlerError::Abort { status, message } => {
            tracing::warn!(
                request_id = %request_id,
                route = %route,
                status = %status,
                message = %message,
                "Request aborted by middleware"
            );
        }
        HandlerError::Internal(source) => {
            tracing::error!(
                request_id = %request_id,
                route = %route,
                error = %source,
                "Handler failed"
            );
        }
    }

    if ctx.is_committed() {
        tracing::debug!(
            request_id = %request_id,
            "Response already committed, not writing error body"
        );
        return ctx.into_response();
    }

    match err {
        HandlerError::Abort { status, message } => response::error_response(status, message),
        HandlerError::Internal(_) => response::server_error(),
    }
}

/// Percent-decode a request path. Paths that do not decode to UTF-8 are
/// matched as-is.
pub fn decode_path(path: &str) -> Cow<'_, str> {
    urlencoding::decode(path).unwrap_or(Cow::Borrowed(path))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::middleware::{from_fn, guard};
    use crate::http::{BoxFuture, HandlerResult};
    use crate::routing::Router;
    use axum::http::{Method, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn echo_params(ctx: &mut Context) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            let name = ctx.param("name").unwrap_or_default().to_string();
            let addr = ctx.param("addr").unwrap_or_default().to_string();
            ctx.string(StatusCode::OK, format!("{name} from {addr}"))
        })
    }

    #[tokio::test]
    async fn test_params_reach_handler() {
        let router = Router::new();
        router.get("/hello/:name/from/:addr", echo_params, &[]);
        let dispatcher = Dispatcher::new(router.routes());

        let res = dispatcher.dispatch(request(Method::GET, "/hello/alice/from/paris")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "alice from paris");
    }

    #[tokio::test]
    async fn test_percent_encoded_path_is_decoded() {
        let router = Router::new();
        router.get("/hello/:name/from/:addr", echo_params, &[]);
        let dispatcher = Dispatcher::new(router.routes());

        let res = dispatcher.dispatch(request(Method::GET, "/hello/j%C3%BCrgen/from/new%20york")).await;
        assert_eq!(body_string(res).await, "jürgen from new york");
    }

    #[tokio::test]
    async fn test_unregistered_is_not_found() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new();
        router.get(
            "/registered",
            move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { ctx.none(StatusCode::OK) })
            },
            &[],
        );
        let dispatcher = Dispatcher::new(router.routes());

        let res = dispatcher.dispatch(request(Method::GET, "/unregistered")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(res).await, r#"{"message":"not found"}"#);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_method_mismatch_is_not_found() {
        let router = Router::new();
        router.post("/items", |ctx| Box::pin(async move { ctx.none(StatusCode::CREATED) }), &[]);
        let dispatcher = Dispatcher::new(router.routes());

        let res = dispatcher.dispatch(request(Method::GET, "/items")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handler_failure_is_generic_500() {
        let router = Router::new();
        router.get(
            "/x",
            |_ctx| Box::pin(async { Err(HandlerError::internal("database password is hunter2")) }),
            &[],
        );
        let dispatcher = Dispatcher::new(router.routes());

        let res = dispatcher.dispatch(request(Method::GET, "/x")).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(res).await, r#"{"message":"server error"}"#);
    }

    #[tokio::test]
    async fn test_failure_after_write_keeps_committed_response() {
        let router = Router::new();
        router.get(
            "/x",
            |ctx| {
                Box::pin(async move {
                    ctx.string(StatusCode::ACCEPTED, "partial")?;
                    Err(HandlerError::internal("late failure"))
                })
            },
            &[],
        );
        let dispatcher = Dispatcher::new(router.routes());

        let res = dispatcher.dispatch(request(Method::GET, "/x")).await;
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert_eq!(body_string(res).await, "partial");
    }

    #[tokio::test]
    async fn test_guard_abort_uses_its_status() {
        let router = Router::new();
        let auth = guard(|ctx| {
            Box::pin(async move {
                if ctx.headers().contains_key("authorization") {
                    Ok(())
                } else {
                    Err(HandlerError::abort(StatusCode::UNAUTHORIZED, "missing credentials"))
                }
            })
        });
        router.get("/secret", |ctx| Box::pin(async move { ctx.string(StatusCode::OK, "s3cr3t") }), &[auth]);
        let dispatcher = Dispatcher::new(router.routes());

        let res = dispatcher.dispatch(request(Method::GET, "/secret")).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_string(res).await, r#"{"message":"missing credentials"}"#);

        let authed = Request::builder()
            .uri("/secret")
            .header("authorization", "Bearer t")
            .body(Body::empty())
            .unwrap();
        let res = dispatcher.dispatch(authed).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "s3cr3t");
    }

    #[tokio::test]
    async fn test_middleware_state_visible_to_handler() {
        let set_user = from_fn(|ctx, next| {
            Box::pin(async move {
                ctx.set("user", "alice".to_string());
                next.run(ctx).await
            })
        });
        let passthrough = from_fn(|ctx, next| Box::pin(next.run(ctx)));

        let router = Router::new();
        router.get(
            "/me",
            |ctx| {
                Box::pin(async move {
                    let user = ctx.get::<String>("user").cloned().unwrap_or_default();
                    ctx.string(StatusCode::OK, user)
                })
            },
            &[set_user, passthrough],
        );
        let dispatcher = Dispatcher::new(router.routes());

        let res = dispatcher.dispatch(request(Method::GET, "/me")).await;
        assert_eq!(body_string(res).await, "alice");
    }

    #[tokio::test]
    async fn test_panic_is_recovered() {
        let router = Router::new();
        router.get(
            "/boom",
            |ctx| {
                Box::pin(async move {
                    if ctx.path() == "/boom" {
                        panic!("kaboom");
                    }
                    ctx.none(StatusCode::OK)
                })
            },
            &[],
        );
        let dispatcher = Dispatcher::new(router.routes());

        let res = dispatcher.dispatch(request(Method::GET, "/boom")).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(res).await, r#"{"message":"server error"}"#);
    }

    #[tokio::test]
    async fn test_empty_ok_when_handler_writes_nothing() {
        let router = Router::new();
        router.delete("/x", |_ctx| Box::pin(async { Ok(()) }), &[]);
        let dispatcher = Dispatcher::new(router.routes());

        let res = dispatcher.dispatch(request(Method::DELETE, "/x")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.is_empty());
    }

    #[tokio::test]
    async fn test_routes_registered_after_start_are_served() {
        let router = Router::new();
        let dispatcher = Dispatcher::new(router.routes());

        let res = dispatcher.dispatch(request(Method::GET, "/late")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        router.get("/late", |ctx| Box::pin(async move { ctx.none(StatusCode::NO_CONTENT) }), &[]);
        let res = dispatcher.dispatch(request(Method::GET, "/late")).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/a%20b"), "/a b");
        assert_eq!(decode_path("/plain"), "/plain");
        // Invalid UTF-8 after decoding: left untouched.
        assert_eq!(decode_path("/%FF"), "/%FF");
    }
}
