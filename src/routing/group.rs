//! Route groups.
//!
//! A group is a prefix plus a middleware list. It writes into the same
//! table as the router it came from and keeps no routes of its own.

use std::path::Path;
use std::sync::Arc;

use axum::http::Method;

use crate::http::handler::Handler;
use crate::http::middleware::BoxedMiddleware;
use crate::http::static_files::StaticFiles;
use crate::routing::table::SharedRoutes;

/// Prefixed registration view over a shared route table.
#[derive(Clone)]
pub struct Group {
    routes: SharedRoutes,
    prefix: String,
    middleware: Vec<BoxedMiddleware>,
}

impl Group {
    /// `inherited` is the parent's middleware at the time of the call; later
    /// changes to the parent do not reach the group.
    pub(crate) fn new(routes: SharedRoutes, prefix: &str, inherited: Vec<BoxedMiddleware>) -> Self {
        Self {
            routes,
            prefix: prefix.to_string(),
            middleware: inherited,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn middleware(&self) -> &[BoxedMiddleware] {
        &self.middleware
    }

    /// Append middleware for routes registered through this group from now on.
    pub fn use_middleware(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Nested group: prefixes concatenate, middleware is snapshotted.
    pub fn group(&self, prefix: &str) -> Group {
        Group::new(
            self.routes.clone(),
            &format!("{}{}", self.prefix, prefix),
            self.middleware.clone(),
        )
    }

    /// Register `handler` for `method` at `prefix + pattern`.
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
            format!("{}{}", self.prefix, pattern),
            Arc::new(handler),
            &self.middleware,
            middleware,
        );
        self
    }

    verb_methods! {
        /// Register a `GET` route under the group prefix.
        get => GET;
        /// Register a `POST` route under the group prefix.
        post => POST;
        /// Register a `PUT` route under the group prefix.
        put => PUT;
        /// Register a `PATCH` route under the group prefix.
        patch => PATCH;
        /// Register a `DELETE` route under the group prefix.
        delete => DELETE;
        /// Register a `HEAD` route under the group prefix.
        head => HEAD;
        /// Register an `OPTIONS` route under the group prefix.
        options => OPTIONS;
    }

    /// Static mount under the group prefix. See [`Router::static_files`].
    ///
    /// [`Router::static_files`]: crate::routing::Router::static_files
    pub fn static_files(
        &self,
        prefix: &str,
        root: impl AsRef<Path>,
        middleware: &[BoxedMiddleware],
    ) -> &Self {
        let files = StaticFiles::new(&format!("{}{}", self.prefix, prefix), root);
        super::register(
            &self.routes,
            Method::GET,
            files.pattern(),
            Arc::new(files),
            &self.middleware,
            middleware,
        );
        self
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("prefix", &self.prefix)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
