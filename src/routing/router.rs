//! Route registration.
//!
//! # Responsibilities
//! - Register handlers per method and pattern
//! - Keep the default middleware list applied to routes registered later
//! - Hand out groups and static file mounts
//!
//! # Design Decisions
//! - `use_middleware` only affects routes registered after the call
//! - Middleware order per route: router list, then the route's own list
//! - Cloning a `Router` shares its table; a clone kept after the server
//!   starts can still register routes

use std::path::Path;
use std::sync::Arc;

use axum::http::Method;

use crate::http::handler::Handler;
use crate::http::middleware::BoxedMiddleware;
use crate::http::static_files::StaticFiles;
use crate::routing::group::Group;
use crate::routing::table::SharedRoutes;

/// Application router: the entry point of the registration API.
#[derive(Clone, Default)]
pub struct Router {
    routes: SharedRoutes,
    middleware: Vec<BoxedMiddleware>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the default middleware list.
    pub fn use_middleware(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    pub fn middleware(&self) -> &[BoxedMiddleware] {
        &self.middleware
    }

    /// Group with `prefix`, inheriting the middleware registered so far.
    pub fn group(&self, prefix: &str) -> Group {
        Group::new(self.routes.clone(), prefix, self.middleware.clone())
    }

    /// Register `handler` for `method` and `pattern`.
    pub fn handle<H: Handler>(
        &self,
        method: Method,
        pattern: &str,
        handler: H,
        middleware: &[BoxedMiddleware],
    ) -> &Self {
        super::register(
            &self.routes,
            method,
            pattern.to_string(),
            Arc::new(handler),
            &self.middleware,
            middleware,
        );
        self
    }

    verb_methods! {
        /// Register a `GET` route.
        get => GET;
        /// Register a `POST` route.
        post => POST;
        /// Register a `PUT` route.
        put => PUT;
        /// Register a `PATCH` route.
        patch => PATCH;
        /// Register a `DELETE` route.
        delete => DELETE;
        /// Register a `HEAD` route.
        head => HEAD;
        /// Register an `OPTIONS` route.
        options => OPTIONS;
    }

    /// Serve files from `./root` under `prefix`.
    ///
    /// Registers `GET {prefix}/:file`, so exactly one path segment below the
    /// prefix is served.
    pub fn static_files(
        &self,
        prefix: &str,
        root: impl AsRef<Path>,
        middleware: &[BoxedMiddleware],
    ) -> &Self {
        let files = StaticFiles::new(prefix, root);
        let pattern = files.pattern();
        self.handle(Method::GET, &pattern, files, middleware)
    }

    /// Shared handle to the route table.
    pub fn routes(&self) -> SharedRoutes {
        self.routes.clone()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
