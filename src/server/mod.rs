//! Server side: routers and the bridge that serves them.
//!
//! # Lifecycle
//!
//! 1. `Router::new` / `Router::with_config` - choose the scheme
//! 2. `Router::get` .. `Router::delete` - register routes
//! 3. `Router::listen` - freeze the table and bind a `SchemeBridge`
//! 4. The registry delivers requests to the bridge until process exit
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bridge` | Protocol handler dispatching into a route table |
//! | `config` | Scheme configuration and validation |
//! | `router` | Registration surface |

// ============================================================================
// Submodules
// ============================================================================

/// Protocol handler for one scheme.
pub mod bridge;

/// Scheme configuration.
pub mod config;

/// Route registration surface.
pub mod router;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::SchemeBridge;
pub use config::{DEFAULT_SCHEME, SchemeConfig, SchemeConfigBuilder};
pub use router::Router;
