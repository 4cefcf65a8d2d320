//! In-process protocol registry.
//!
//! The registry plays the role of the message-passing substrate: it binds
//! one [`ProtocolHandler`] per scheme and delivers raw requests to it,
//! correlating each request with its reply over a oneshot channel.
//!
//! # Dispatch Flow
//!
//! 1. Caller hands a [`RawRequest`] to [`ProtocolRegistry::dispatch`]
//! 2. Registry resolves the scheme to a handler
//! 3. Handler receives the request plus a [`Completion`]
//! 4. Caller resumes when the completion fires
//!
//! There is no timeout: a handler that never completes leaves the caller
//! pending. Dropping the completion unfired resolves the caller with
//! [`Error::ChannelClosed`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

use super::{Completion, NetError, ProtocolReply, RawRequest};

// ============================================================================
// ProtocolHandler
// ============================================================================

/// Handler bound to a scheme.
///
/// Implementations must eventually call `complete` exactly once, or drop it.
pub trait ProtocolHandler: Send + Sync {
    /// Handles one raw request.
    fn handle(&self, request: RawRequest, complete: Completion);
}

impl<F> ProtocolHandler for F
where
    F: Fn(RawRequest, Completion) + Send + Sync,
{
    fn handle(&self, request: RawRequest, complete: Completion) {
        self(request, complete);
    }
}

// ============================================================================
// ProtocolRegistry
// ============================================================================

/// Scheme name to handler bindings.
///
/// Thread-safe; share it behind an [`Arc`].
#[derive(Default)]
pub struct ProtocolRegistry {
    /// Bound handlers by scheme.
    handlers: RwLock<FxHashMap<String, Arc<dyn ProtocolHandler>>>,
}

impl ProtocolRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to `scheme`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemeAlreadyRegistered`] if the scheme is taken.
    pub fn register(&self, scheme: &str, handler: Arc<dyn ProtocolHandler>) -> Result<()> {
        let mut handlers = self.handlers.write();

        if handlers.contains_key(scheme) {
            warn!(scheme, "Scheme already registered");
            return Err(Error::scheme_already_registered(scheme));
        }

        handlers.insert(scheme.to_string(), handler);
        debug!(scheme, "Scheme registered");
        Ok(())
    }

    /// Returns `true` if a handler is bound to `scheme`.
    #[inline]
    #[must_use]
    pub fn is_registered(&self, scheme: &str) -> bool {
        self.handlers.read().contains_key(scheme)
    }

    /// Returns the registered scheme names, sorted.
    #[must_use]
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<_> = self.handlers.read().keys().cloned().collect();
        schemes.sort_unstable();
        schemes
    }

    /// Delivers `request` to its scheme handler and waits for the reply.
    ///
    /// An unknown scheme resolves to [`NetError::UnknownUrlScheme`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the handler drops its completion
    /// without replying.
    pub async fn dispatch(&self, request: RawRequest) -> Result<ProtocolReply> {
        let handler = request
            .scheme()
            .and_then(|scheme| self.handlers.read().get(scheme).cloned());

        let Some(handler) = handler else {
            debug!(id = %request.id, url = %request.url, "No handler for scheme");
            return Ok(ProtocolReply::Error(NetError::UnknownUrlScheme));
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let id = request.id;

        trace!(%id, method = %request.method, url = %request.url, "Dispatching request");

        handler.handle(
            request,
            Box::new(move |reply: ProtocolReply| {
                let _ = reply_tx.send(reply);
            }),
        );

        let reply = reply_rx.await?;
        trace!(%id, error = ?reply.error(), "Request completed");
        Ok(reply)
    }
}

impl fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::{MIME_TEXT, ProtocolResponse};

    fn echo() -> Arc<dyn ProtocolHandler> {
        Arc::new(|request: RawRequest, complete: Completion| {
            complete(ProtocolReply::Response(ProtocolResponse::new(
                MIME_TEXT,
                request.path().as_bytes(),
            )));
        })
    }

    #[test]
    fn test_register_once() {
        let registry = ProtocolRegistry::new();
        registry.register("backend", echo()).expect("register");

        assert!(registry.is_registered("backend"));
        assert!(!registry.is_registered("other"));
        assert_eq!(registry.schemes(), ["backend"]);
    }

    #[test]
    fn test_register_twice_fails() {
        let registry = ProtocolRegistry::new();
        registry.register("backend", echo()).expect("register");

        let err = registry.register("backend", echo()).unwrap_err();
        assert!(matches!(err, Error::SchemeAlreadyRegistered { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_reaches_handler() {
        let registry = ProtocolRegistry::new();
        registry.register("backend", echo()).expect("register");

        let reply = registry
            .dispatch(RawRequest::new("GET", "backend:/db/issues"))
            .await
            .expect("dispatch");

        let response = reply.response().expect("response");
        assert_eq!(response.data, b"/db/issues");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_scheme() {
        let registry = ProtocolRegistry::new();
        let reply = registry
            .dispatch(RawRequest::new("GET", "nowhere:/x"))
            .await
            .expect("dispatch");

        assert_eq!(reply.error(), Some(NetError::UnknownUrlScheme));
    }

    #[tokio::test]
    async fn test_dispatch_dropped_completion() {
        let registry = ProtocolRegistry::new();
        registry
            .register(
                "backend",
                Arc::new(|_: RawRequest, complete: Completion| drop(complete)),
            )
            .expect("register");

        let err = registry
            .dispatch(RawRequest::new("GET", "backend:/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelClosed(_)));
    }

    #[tokio::test]
    async fn test_dispatch_completes_from_task() {
        let registry = ProtocolRegistry::new();
        registry
            .register(
                "backend",
                Arc::new(|_: RawRequest, complete: Completion| {
                    tokio::spawn(async move {
                        tokio::task::yield_now().await;
                        complete(ProtocolReply::Error(NetError::Failed));
                    });
                }),
            )
            .expect("register");

        let reply = registry
            .dispatch(RawRequest::new("GET", "backend:/x"))
            .await
            .expect("dispatch");
        assert_eq!(reply.error(), Some(NetError::Failed));
    }
}
