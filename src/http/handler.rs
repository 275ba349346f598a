//! Handler contract.
//!
//! A handler receives the request [`Context`], writes its response through it,
//! and reports success or failure. The dispatcher turns failures into
//! responses, so handlers never build error pages themselves.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;

use crate::http::context::Context;

/// Boxed, sendable future borrowed for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased error carried by [`HandlerError::Internal`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of a handler or middleware.
pub type HandlerResult = Result<(), HandlerError>;

/// Failures reported by handlers and middleware.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The chain was stopped on purpose with a client-facing status and message.
    #[error("request aborted with {status}: {message}")]
    Abort { status: StatusCode, message: String },

    /// Anything else. Rendered as a generic 500; the detail is only logged.
    #[error("{0}")]
    Internal(BoxError),
}

impl HandlerError {
    pub fn abort(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Abort {
            status,
            message: message.into(),
        }
    }

    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self::Internal(err.into())
    }

    /// Status the dispatcher responds with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Abort { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(err)
    }
}

impl From<serde_urlencoded::de::Error> for HandlerError {
    fn from(err: serde_urlencoded::de::Error) -> Self {
        Self::internal(err)
    }
}

impl From<serde_urlencoded::ser::Error> for HandlerError {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Self::internal(err)
    }
}

impl From<axum::Error> for HandlerError {
    fn from(err: axum::Error) -> Self {
        Self::internal(err)
    }
}

impl From<axum::http::Error> for HandlerError {
    fn from(err: axum::http::Error) -> Self {
        Self::internal(err)
    }
}

/// Terminal request handler.
///
/// Implemented automatically for closures of the shape
/// `|ctx: &mut Context| Box::pin(async move { ... })`.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (self)(ctx)
    }
}

/// Shared, type-erased handler. Middleware wraps and returns these.
pub type BoxedHandler = Arc<dyn Handler>;

/// Erase a closure handler. Pins the closure signature so callers can write
/// `handler_fn(|ctx| Box::pin(async move { ... }))` without annotations.
pub fn handler_fn<F>(f: F) -> BoxedHandler
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(f)
}
