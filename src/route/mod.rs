//! Route patterns and the route table.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `method` | Request method enum |
//! | `params` | Ordered path parameters |
//! | `pattern` | Pattern string compiler |
//! | `table` | Ordered first-match route table |

// ============================================================================
// Submodules
// ============================================================================

/// Request methods.
pub mod method;

/// Ordered path parameters.
pub mod params;

/// Route pattern compiler.
pub mod pattern;

/// Ordered route table.
pub mod table;

// ============================================================================
// Re-exports
// ============================================================================

pub use method::Method;
pub use params::Params;
pub use pattern::RoutePattern;
pub use table::{Handler, Route, RouteTable};
