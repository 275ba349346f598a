//! Middleware chain composition.
//!
//! # Data Flow
//! ```text
//! [m1, m2, m3] + handler
//!     → compose(): fold right-to-left
//!     → m1(m2(m3(handler)))
//!
//! Request:   m1 pre → m2 pre → m3 pre → handler
//! Response:  m1 post ← m2 post ← m3 post ←
//! ```
//!
//! # Design Decisions
//! - Decorator model is canonical: a middleware takes the next handler and
//!   returns a new handler, so it can run code before and after `next` and
//!   can skip `next` entirely
//! - The first registered middleware is the outermost one
//! - Guards (run-before, abort-on-error) are built on top of decorators and
//!   cannot post-process
//! - Chains are composed once at registration, not per request

use std::sync::Arc;

use crate::http::context::Context;
use crate::http::handler::{BoxFuture, BoxedHandler, Handler, HandlerResult};

/// Wraps the rest of the chain.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;

    /// Name used in route listings and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        (self)(next)
    }

    fn name(&self) -> &str {
        "middleware"
    }
}

/// Shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of the chain, handed to [`from_fn`] middleware.
#[derive(Clone)]
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    pub fn new(inner: BoxedHandler) -> Self {
        Self { inner }
    }

    /// Run the rest of the chain (later middleware, then the handler).
    pub async fn run(self, ctx: &mut Context) -> HandlerResult {
        self.inner.call(ctx).await
    }
}

/// Fold `middleware` around `handler` so that `middleware[0]` runs first.
pub fn compose(handler: BoxedHandler, middleware: &[BoxedMiddleware]) -> BoxedHandler {
    middleware
        .iter()
        .rev()
        .fold(handler, |next, m| m.wrap(next))
}

/// Middleware from an async function of the context and the rest of the chain.
///
/// ```ignore
/// let timing = middleware::from_fn(|ctx, next| Box::pin(async move {
///     let start = std::time::Instant::now();
///     let result = next.run(ctx).await;
///     tracing::info!(elapsed = ?start.elapsed(), "done");
///     result
/// }));
/// ```
pub fn from_fn<F>(f: F) -> BoxedMiddleware
where
    F: for<'a> Fn(&'a mut Context, Next) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(FromFn {
        f: Arc::new(f),
        name: "from_fn",
    })
}

/// Like [`from_fn`], with a name for logs and route listings.
pub fn from_fn_named<F>(name: &'static str, f: F) -> BoxedMiddleware
where
    F: for<'a> Fn(&'a mut Context, Next) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(FromFn { f: Arc::new(f), name })
}

struct FromFn<F> {
    f: Arc<F>,
    name: &'static str,
}

impl<F> Middleware for FromFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(FromFnHandler {
            f: self.f.clone(),
            next: Next::new(next),
        })
    }

    fn name(&self) -> &str {
        self.name
    }
}

struct FromFnHandler<F> {
    f: Arc<F>,
    next: Next,
}

impl<F> Handler for FromFnHandler<F>
where
    F: for<'a> Fn(&'a mut Context, Next) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (self.f)(ctx, self.next.clone())
    }
}

/// Guard middleware: runs `check` before the rest of the chain.
///
/// An `Err` stops the chain and goes to the dispatcher's error path; `Ok`
/// always continues. Guards see the request but never the handler's outcome.
pub fn guard<F>(check: F) -> BoxedMiddleware
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    let check = Arc::new(check);
    Arc::new(Guard { check })
}

struct Guard<F> {
    check: Arc<F>,
}

impl<F> Middleware for Guard<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(GuardHandler {
            check: self.check.clone(),
            next,
        })
    }

    fn name(&self) -> &str {
        "guard"
    }
}

struct GuardHandler<F> {
    check: Arc<F>,
    next: BoxedHandler,
}

impl<F> Handler for GuardHandler<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            (self.check)(&mut *ctx).await?;
            self.next.call(ctx).await
        })
    }
}
