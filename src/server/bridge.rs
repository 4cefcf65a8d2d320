//! Server side of the scheme bridge.
//!
//! A [`SchemeBridge`] is the [`ProtocolHandler`] bound to one scheme. For
//! each raw request it moves through:
//!
//! ```text
//! Received ──► Matched ──► Handled
//!     │
//!     └──────► Unmatched ──► ErrorSignaled (NetError::InvalidUrl)
//! ```
//!
//! Nothing raised while matching or building the request escapes: every
//! failure is turned into a reply on the completion callback.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, warn};

use crate::error::Error;
use crate::exchange::{Payload, Request, Response};
use crate::protocol::{Completion, NetError, ProtocolHandler, ProtocolReply, RawRequest};
use crate::route::{Method, RouteTable};

// ============================================================================
// SchemeBridge
// ============================================================================

/// Dispatches raw requests for one scheme into a route table.
#[derive(Debug, Clone)]
pub struct SchemeBridge {
    /// Scheme this bridge answers.
    scheme: String,
    /// Routes, frozen at construction.
    routes: Arc<RouteTable>,
}

impl SchemeBridge {
    /// Creates a bridge over `routes`.
    #[must_use]
    pub fn new(scheme: impl Into<String>, routes: Arc<RouteTable>) -> Self {
        Self {
            scheme: scheme.into(),
            routes,
        }
    }

    /// Returns the scheme name.
    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the route table.
    #[inline]
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Strips `<scheme>:` from `url`, falling back to the text after the
    /// first `:` for foreign URLs.
    fn path_of<'a>(&self, request: &'a RawRequest) -> &'a str {
        request
            .url
            .strip_prefix(self.scheme.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or_else(|| request.path())
    }
}

impl ProtocolHandler for SchemeBridge {
    fn handle(&self, request: RawRequest, complete: Completion) {
        let path = self.path_of(&request);

        let route = request
            .method
            .parse::<Method>()
            .ok()
            .and_then(|method| self.routes.find_match(method, path));

        let Some(route) = route else {
            let err = Error::no_route_matched(&request.method, path);
            debug!(id = %request.id, %err, "Signalling out-of-band error");
            complete(ProtocolReply::Error(NetError::InvalidUrl));
            return;
        };

        let structured = match Request::build(&route.pattern, &request) {
            Ok(structured) => structured,
            Err(err @ Error::BodyParse { .. }) => {
                warn!(id = %request.id, %err, "Rejecting malformed body");
                complete(ProtocolReply::Response(client_error(&err)));
                return;
            }
            Err(err) => {
                error!(
                    id = %request.id,
                    pattern = route.pattern.source(),
                    %err,
                    "Failed to build request"
                );
                complete(ProtocolReply::Error(NetError::Failed));
                return;
            }
        };

        debug!(
            id = %request.id,
            method = %route.method,
            pattern = route.pattern.source(),
            "Invoking handler"
        );

        (route.handler)(structured, Response::with_id(request.id, complete));
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Builds the structured JSON payload for a client error.
fn client_error(err: &Error) -> crate::protocol::ProtocolResponse {
    let kind = match err {
        Error::BodyParse { .. } => "bodyParse",
        _ => "client",
    };

    Payload::Json(json!({
        "error": {
            "kind": kind,
            "message": err.to_string(),
        }
    }))
    .into_protocol_response()
}

// ============================================================================
// Tests
// ============================================================================
