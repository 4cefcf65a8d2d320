//! Route registration surface.
//!
//! One [`Router`] serves one scheme. Routes are registered with the five
//! method helpers, then [`Router::listen`] freezes the table and binds a
//! [`SchemeBridge`] to the registry.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use scheme_router::{ProtocolRegistry, Router};
//!
//! # fn main() -> scheme_router::Result<()> {
//! let registry = Arc::new(ProtocolRegistry::new());
//!
//! let mut router = Router::new();
//! router
//!     .get("/db/issues/:id", |req, res| {
//!         let _ = res.send(format!("issue {}", req.param("id").unwrap_or("?")));
//!     })?
//!     .post("/db/issues", |req, res| {
//!         let _ = res.json(&req.body);
//!     })?;
//!
//! router.listen(&registry)?;
//! assert!(registry.is_registered("backend"));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::exchange::{Request, Response};
use crate::protocol::ProtocolRegistry;
use crate::route::{Method, RouteTable};

use super::{SchemeBridge, SchemeConfig};

// ============================================================================
// Router
// ============================================================================

/// Route registration for one scheme.
#[derive(Debug, Default, Clone)]
pub struct Router {
    /// Scheme configuration.
    config: SchemeConfig,
    /// Registered routes.
    routes: RouteTable,
}

// ============================================================================
// Router - Constructors
// ============================================================================

impl Router {
    /// Creates a router for the default `backend` scheme.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router with explicit configuration.
    #[inline]
    #[must_use]
    pub fn with_config(config: SchemeConfig) -> Self {
        Self {
            config,
            routes: RouteTable::new(),
        }
    }
}

// ============================================================================
// Router - Registration
// ============================================================================

impl Router {
    /// Registers `handler` for `method` on `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if the pattern is rejected.
    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(Request, Response) + Send + Sync + 'static,
    {
        self.routes.register(method, pattern, Arc::new(handler))?;
        Ok(self)
    }

    /// Registers a `GET` route.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if the pattern is rejected.
    pub fn get<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(Request, Response) + Send + Sync + 'static,
    {
        self.route(Method::Get, pattern, handler)
    }

    /// Registers a `POST` route.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if the pattern is rejected.
    pub fn post<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(Request, Response) + Send + Sync + 'static,
    {
        self.route(Method::Post, pattern, handler)
    }

    /// Registers a `PUT` route.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if the pattern is rejected.
    pub fn put<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(Request, Response) + Send + Sync + 'static,
    {
        self.route(Method::Put, pattern, handler)
    }

    /// Registers a `PATCH` route.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if the pattern is rejected.
    pub fn patch<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(Request, Response) + Send + Sync + 'static,
    {
        self.route(Method::Patch, pattern, handler)
    }

    /// Registers a `DELETE` route.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if the pattern is rejected.
    pub fn delete<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(Request, Response) + Send + Sync + 'static,
    {
        self.route(Method::Delete, pattern, handler)
    }
}

// ============================================================================
// Router - Accessors & Binding
// ============================================================================

impl Router {
    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SchemeConfig {
        &self.config
    }

    /// Returns the registered routes.
    #[inline]
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Freezes the routes into a bridge without binding it.
    #[must_use]
    pub fn into_bridge(self) -> SchemeBridge {
        SchemeBridge::new(self.config.scheme(), Arc::new(self.routes))
    }

    /// Binds this router to its scheme on `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SchemeAlreadyRegistered`] if another handler
    /// already owns the scheme.
    pub fn listen(self, registry: &ProtocolRegistry) -> Result<Arc<SchemeBridge>> {
        let route_count = self.routes.len();
        let bridge = Arc::new(self.into_bridge());

        registry.register(bridge.scheme(), Arc::clone(&bridge) as _)?;

        info!(scheme = bridge.scheme(), route_count, "Router listening");
        Ok(bridge)
    }
}

// ============================================================================
// Tests
// ============================================================================
