//! Ordered route table.
//!
//! Routes are appended in registration order and never removed. Lookup
//! scans in that order and the first route whose method and pattern both
//! match wins, so an earlier broad pattern shadows a later narrow one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::Result;
use crate::exchange::{Request, Response};

use super::{Method, RoutePattern};

// ============================================================================
// Types
// ============================================================================

/// Route handler callback.
///
/// Invoked once per matched request. The handler may finish its work
/// asynchronously; the request completes when it calls [`Response::send`].
pub type Handler = Arc<dyn Fn(Request, Response) + Send + Sync>;

// ============================================================================
// Route
// ============================================================================

/// A registered `(method, pattern, handler)` entry.
#[derive(Clone)]
pub struct Route {
    /// Method this route answers.
    pub method: Method,
    /// Compiled path pattern.
    pub pattern: RoutePattern,
    /// Handler invoked on match.
    pub handler: Handler,
}

impl Route {
    /// Returns `true` if this route answers `method` on `path`.
    #[inline]
    #[must_use]
    pub fn matches(&self, method: Method, path: &str) -> bool {
        self.method == method && self.pattern.is_match(path)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.source())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RouteTable
// ============================================================================

/// Append-only list of routes with first-match lookup.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Creates an empty table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `pattern` and appends a route.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if the pattern is rejected;
    /// the table is left unchanged.
    pub fn register(&mut self, method: Method, pattern: &str, handler: Handler) -> Result<()> {
        let pattern = RoutePattern::compile(pattern)?;

        debug!(%method, pattern = pattern.source(), index = self.routes.len(), "Route registered");

        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
        Ok(())
    }

    /// Returns the first route answering `method` on `path`.
    #[must_use]
    pub fn find_match(&self, method: Method, path: &str) -> Option<&Route> {
        let found = self.routes.iter().find(|route| route.matches(method, path));

        trace!(%method, path, matched = found.map(|r| r.pattern.source()), "Route lookup");

        found
    }

    /// Number of registered routes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates routes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::Error;

    fn noop() -> Handler {
        Arc::new(|_, _| {})
    }

    #[test]
    fn test_register_appends_in_order() {
        let mut table = RouteTable::new();
        table.register(Method::Get, "/a", noop()).expect("register");
        table.register(Method::Post, "/b", noop()).expect("register");

        let sources: Vec<_> = table.iter().map(|r| r.pattern.source()).collect();
        assert_eq!(sources, ["/a", "/b"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_invalid_pattern_leaves_table_unchanged() {
        let mut table = RouteTable::new();
        let err = table.register(Method::Get, "/:a:b", noop()).unwrap_err();

        assert!(matches!(err, Error::InvalidPattern { .. }));
        assert!(table.is_empty());
    }

    #[test]
    fn test_find_match_checks_method() {
        let mut table = RouteTable::new();
        table.register(Method::Post, "/db/issues", noop()).expect("register");

        assert!(table.find_match(Method::Get, "/db/issues").is_none());
        assert!(table.find_match(Method::Post, "/db/issues").is_some());
    }

    #[test]
    fn test_find_match_none_when_empty() {
        let table = RouteTable::new();
        assert!(table.find_match(Method::Get, "/anything").is_none());
    }

    #[test]
    fn test_first_registered_wins() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut table = RouteTable::new();

        table
            .register(Method::Get, "/db/*", noop())
            .expect("register");
        let counter = Arc::clone(&hits);
        table
            .register(
                Method::Get,
                "/db/issues/:id",
                Arc::new(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .expect("register");

        let route = table.find_match(Method::Get, "/db/issues/7").expect("match");
        assert_eq!(route.pattern.source(), "/db/*");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut table = RouteTable::new();
        table.register(Method::Get, "/a", noop()).expect("register");
        table.register(Method::Get, "/a", noop()).expect("register");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_route_debug_omits_handler() {
        let mut table = RouteTable::new();
        table.register(Method::Delete, "/a/:id", noop()).expect("register");
        let debug = format!("{:?}", table.iter().next().expect("route"));
        assert!(debug.contains("Delete"));
        assert!(debug.contains("/a/:id"));
    }
}
