//! Mapes: a small HTTP router.
//!
//! Routes are `(method, pattern)` pairs where a pattern is a `/`-separated
//! list of literal segments and `:name` parameters. Each route carries a
//! middleware chain composed once at registration. Groups share a prefix
//! and middleware, static mounts serve one directory level.
//!
//! ```no_run
//! use mapes::{HttpServer, MapesConfig, Router};
//! use axum::http::StatusCode;
//!
//! # async fn run() -> Result<(), mapes::ServerError> {
//! let router = Router::new();
//! router.get("/hello/:name", |ctx| {
//!     Box::pin(async move {
//!         let name = ctx.param("name").unwrap_or_default().to_string();
//!         ctx.string(StatusCode::OK, format!("Hello, {name}"))
//!     })
//! }, &[]);
//!
//! HttpServer::new(MapesConfig::default(), &router).start().await
//! # }
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::MapesConfig;
pub use http::{
    from_fn, from_fn_named, guard, BoxFuture, BoxedMiddleware, Context, HandlerError,
    HandlerResult, HttpServer, Next, ServerError,
};
pub use lifecycle::Shutdown;
pub use routing::{Group, Router};
