//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID and trace layers)
//!     → dispatcher.rs (route lookup, chain run, error recovery)
//!     → middleware.rs + handler.rs (user code, through context.rs)
//!     → response.rs (committed response or JSON error body)
//!     → Send to client
//! ```

pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;

pub use context::Context;
pub use dispatcher::Dispatcher;
pub use handler::{handler_fn, BoxFuture, BoxedHandler, Handler, HandlerError, HandlerResult};
pub use middleware::{compose, from_fn, from_fn_named, guard, BoxedMiddleware, Middleware, Next};
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use response::{ErrorBody, ResponseWriter};
pub use server::{HttpServer, ServerError};
pub use static_files::StaticFiles;
