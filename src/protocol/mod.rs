//! Custom scheme protocol layer.
//!
//! This module defines the buffers that cross the substrate and the
//! registry that binds scheme names to handlers.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `RawRequest` | Caller → Handler | Method, `<scheme>:<path>` target, body |
//! | `ProtocolResponse` | Handler → Caller | Mime type plus bytes |
//! | `NetError` | Handler → Caller | Out-of-band failure code |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Wire types |
//! | `registry` | Scheme to handler bindings and dispatch |

// ============================================================================
// Submodules
// ============================================================================

/// Wire types.
pub mod message;

/// Scheme registry.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{
    Completion, MIME_JSON, MIME_TEXT, NetError, ProtocolReply, ProtocolResponse, RawRequest,
    UploadData,
};
pub use registry::{ProtocolHandler, ProtocolRegistry};
