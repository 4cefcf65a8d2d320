//! Scheme Router - Express-style routing over custom in-process URL schemes.
//!
//! This library lets an application answer requests such as
//! `backend:/db/issues/7` with ordinary route handlers, without opening a
//! network socket.
//!
//! # Architecture
//!
//! The router follows a client-server model over one in-process substrate:
//!
//! - **Server side**: a [`Router`] registers `(method, pattern, handler)`
//!   routes and binds a [`SchemeBridge`] to its scheme
//! - **Substrate**: the [`ProtocolRegistry`] maps scheme names to handlers
//!   and delivers raw requests with a completion callback
//! - **Client side**: a [`SchemeRequest`] wraps a request object and sends
//!   scheme URLs through the registry instead of the network
//!
//! Key design principles:
//!
//! - Routes are append-only and the first registered match wins
//! - Every request completes exactly once, as a reply or an error code
//! - Handlers may answer synchronously or from a spawned task
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use scheme_router::client::{HttpRequest, OfflineRequest, ResponseSnapshot, SchemeRequest};
//! use scheme_router::{ProtocolRegistry, Result, Router, SchemeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = Arc::new(ProtocolRegistry::new());
//!
//!     let mut router = Router::new();
//!     router.get("/db/issues/:id", |req, res| {
//!         let _ = res.send(format!("issue {}", req.param("id").unwrap_or("?")));
//!     })?;
//!     router.listen(&registry)?;
//!
//!     let mut request =
//!         SchemeRequest::new(OfflineRequest::new(), registry, &SchemeConfig::default());
//!     request.on_load(Box::new(|snapshot: &ResponseSnapshot| {
//!         println!("{}", snapshot.response);
//!     }));
//!     request.open("GET", "backend:/db/issues/7", true)?;
//!     request.send(None)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Request-object decorator and fetch primitive |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`exchange`] | Per-call [`Request`] and single-use [`Response`] |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire types and the [`ProtocolRegistry`] substrate |
//! | [`route`] | Pattern compiler and route table |
//! | [`server`] | [`Router`], [`SchemeBridge`] and configuration |
//! | [`storage`] | Storage collaborator contract |

// ============================================================================
// Modules
// ============================================================================

/// Client side of the bridge.
///
/// - [`SchemeRequest`] - decorator that serves one scheme in-process
/// - [`client::Fetch`] - substrate fetch primitive
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Request and response adapters handed to route handlers.
pub mod exchange;

/// Type-safe identifiers.
pub mod identifiers;

/// Protocol wire types and scheme registry.
pub mod protocol;

/// Route patterns and the route table.
pub mod route;

/// Routers and the server-side bridge.
pub mod server;

/// Storage collaborator contract.
pub mod storage;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Fetch, HttpRequest, SchemeRequest};

// Error types
pub use error::{Error, Result};

// Exchange types
pub use exchange::{Payload, Request, Response};

// Identifier types
pub use identifiers::RequestId;

// Protocol types
pub use protocol::{NetError, ProtocolHandler, ProtocolRegistry, ProtocolReply, RawRequest};

// Route types
pub use route::{Method, Params, RoutePattern};

// Server types
pub use server::{DEFAULT_SCHEME, Router, SchemeBridge, SchemeConfig};

// Storage types
pub use storage::{ExecuteResult, Row, Storage};
