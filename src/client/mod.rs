//! Client side: request objects that speak a custom scheme.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `fetch` | [`Fetch`] primitive and its [`ProtocolRegistry`](crate::ProtocolRegistry) impl |
//! | `request` | [`HttpRequest`] capability and exactly-once completion events |
//! | `scheme_request` | [`SchemeRequest`] decorator |

// ============================================================================
// Submodules
// ============================================================================

/// Substrate-level fetch primitive.
pub mod fetch;

/// Request-object capability.
pub mod request;

/// Scheme-aware request decorator.
pub mod scheme_request;

// ============================================================================
// Re-exports
// ============================================================================

pub use fetch::{Fetch, FetchRequest, FetchResponse};
pub use request::{
    CompletionEvents, CompletionKind, ErrorListener, HttpRequest, LoadListener, OfflineRequest,
    ResponseSnapshot,
};
pub use scheme_request::{PendingClientRequest, SchemeRequest};
