//! Route storage and lookup.
//!
//! # Responsibilities
//! - Store route entries keyed by (method, pattern)
//! - Resolve a request (method, path) to an entry plus parameters
//! - Publish table snapshots that request tasks read without locking
//!
//! # Design Decisions
//! - Entries are immutable once registered; re-registering the same
//!   (method, pattern) replaces the old entry in place
//! - Lookup is a linear scan over entries kept in specificity order
//!   (literal segments before parameters at the first difference), ties in
//!   registration order; the first structural match with the right method wins
//! - A method mismatch is a plain no-match (404), same as an unknown path
//! - Updates are copy-on-write through `ArcSwap`, so registration may happen
//!   after the server started without blocking readers

use std::cmp::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::Method;

use crate::http::handler::BoxedHandler;
use crate::http::middleware::{compose, BoxedMiddleware};
use crate::routing::matcher::{Params, RoutePattern};

/// A registered route.
pub struct RouteEntry {
    method: Method,
    pattern: RoutePattern,
    middleware: Vec<BoxedMiddleware>,
    chain: BoxedHandler,
}

impl RouteEntry {
    /// Build an entry, composing `middleware` around `handler`.
    pub fn new(
        method: Method,
        pattern: RoutePattern,
        handler: BoxedHandler,
        middleware: Vec<BoxedMiddleware>,
    ) -> Self {
        let chain = compose(handler, &middleware);
        Self {
            method,
            pattern,
            middleware,
            chain,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn middleware(&self) -> &[BoxedMiddleware] {
        &self.middleware
    }

    /// Middleware composed around the handler, ready to call.
    pub fn chain(&self) -> &BoxedHandler {
        &self.chain
    }

    fn same_key(&self, other: &RouteEntry) -> bool {
        self.method == other.method && self.pattern.as_str() == other.pattern.as_str()
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Arc<RouteEntry>,
    pub params: Params,
}

/// Immutable view of all registered routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<Arc<RouteEntry>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any entry with the same (method, pattern).
    /// Returns true if an existing entry was replaced.
    pub fn insert(&mut self, entry: Arc<RouteEntry>) -> bool {
        if let Some(slot) = self.entries.iter_mut().find(|e| e.same_key(&entry)) {
            *slot = entry;
            return true;
        }

        let position = self
            .entries
            .iter()
            .position(|e| entry.pattern.specificity_cmp(&e.pattern) == Ordering::Less)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, entry);
        false
    }

    /// Find the route for a request. `path` must already be percent-decoded.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.entries.iter().find_map(|entry| {
            if entry.method != *method {
                return None;
            }
            entry.pattern.matches(path).map(|params| RouteMatch {
                entry: entry.clone(),
                params,
            })
        })
    }

    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared handle to the live route table.
///
/// Cloning the handle shares the table. Readers take snapshots; writers
/// publish a modified copy.
#[derive(Clone, Default)]
pub struct SharedRoutes {
    inner: Arc<ArcSwap<RouteTable>>,
}

impl SharedRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current table. Stays valid (and unchanged) while held.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.inner.load_full()
    }

    /// Copy-on-write insert.
    pub fn register(&self, entry: RouteEntry) {
        let entry = Arc::new(entry);
        let mut replaced = false;
        self.inner.rcu(|table| {
            let mut next = RouteTable::clone(table);
            replaced = next.insert(entry.clone());
            next
        });

        tracing::debug!(
            method = %entry.method,
            pattern = %entry.pattern,
            middleware = entry.middleware.len(),
            replaced,
            "Route registered"
        );
    }
}

impl std::fmt::Debug for SharedRoutes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRoutes")
            .field("routes", &self.snapshot().len())
            .finish()
    }
}
