//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup, or live through a Router clone):
//!     Router / Group verb call
//!     → prefix + pattern, inherited + route middleware
//!     → RouteEntry (chain composed once)
//!     → SharedRoutes copy-on-write insert
//!
//! Incoming Request (method, decoded path)
//!     → table.rs (linear scan in specificity order)
//!     → matcher.rs (segment-by-segment match, parameter extraction)
//!     → Return: RouteMatch or None
//! ```
//!
//! # Design Decisions
//! - Routes keyed by (method, pattern); same key re-registered replaces
//! - Deterministic: literal segments win over parameters, then
//!   registration order
//! - Groups are views over the shared table, they store no routes

/// Verb shorthands shared by [`Router`] and [`Group`]. Both must provide a
/// `handle(method, pattern, handler, middleware)` method.
macro_rules! verb_methods {
    ($($(#[$doc:meta])* $name:ident => $method:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<F>(
                &self,
                pattern: &str,
                handler: F,
                middleware: &[crate::http::middleware::BoxedMiddleware],
            ) -> &Self
            where
                F: for<'a> Fn(
                        &'a mut crate::http::Context,
                    ) -> crate::http::handler::BoxFuture<'a, crate::http::handler::HandlerResult>
                    + Send
                    + Sync
                    + 'static,
            {
                self.handle(axum::http::Method::$method, pattern, handler, middleware)
            }
        )*
    };
}

pub mod group;
pub mod matcher;
pub mod router;
pub mod table;

pub use group::Group;
pub use matcher::{match_pattern, Params, RoutePattern, Segment, PARAM_SENTINEL};
pub use router::Router;
pub use table::{RouteEntry, RouteMatch, RouteTable, SharedRoutes};

use axum::http::Method;

use crate::http::handler::BoxedHandler;
use crate::http::middleware::BoxedMiddleware;

/// Build and store an entry whose middleware is `inherited` followed by `own`.
fn register(
    routes: &SharedRoutes,
    method: Method,
    pattern: String,
    handler: BoxedHandler,
    inherited: &[BoxedMiddleware],
    own: &[BoxedMiddleware],
) {
    let pattern = RoutePattern::parse(pattern);
    let duplicates = pattern.duplicate_params();
    if !duplicates.is_empty() {
        tracing::warn!(
            pattern = %pattern,
            params = ?duplicates,
            "Duplicate parameter names, last occurrence wins"
        );
    }

    let middleware = inherited.iter().chain(own).cloned().collect();
    routes.register(RouteEntry::new(method, pattern, handler, middleware));
}
