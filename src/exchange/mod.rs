//! Request/response adapter.
//!
//! Turns a matched [`RawRequest`](crate::protocol::RawRequest) into the
//! structured [`Request`] a handler reads, and gives the handler a
//! [`Response`] whose `send` serializes back into a protocol buffer.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `request` | Params and parsed JSON body |
//! | `response` | Single-use response sink and payload classification |

// ============================================================================
// Submodules
// ============================================================================

/// Structured requests.
pub mod request;

/// Response sink.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use request::Request;
pub use response::{Payload, Response};
