//! Error types for scheme-router.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use scheme_router::{Result, Router};
//!
//! fn routes(router: &mut Router) -> Result<()> {
//!     router.get("/db/issues/:id", |req, res| { /* ... */ })?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Registration | [`Error::InvalidPattern`], [`Error::SchemeAlreadyRegistered`], [`Error::Config`] |
//! | Dispatch | [`Error::MatchExtraction`], [`Error::BodyParse`], [`Error::NoRouteMatched`], [`Error::UnsupportedMethod`] |
//! | Response | [`Error::ResponseAlreadySent`] |
//! | Client | [`Error::Transport`], [`Error::UnsupportedMode`], [`Error::InvalidState`] |
//! | Storage | [`Error::Storage`] |
//! | External | [`Error::Json`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::protocol::NetError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Registration Errors
    // ========================================================================
    /// Route pattern rejected by the compiler.
    ///
    /// Returned synchronously from route registration.
    #[error("Invalid route pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The offending pattern source.
        pattern: String,
        /// Why the pattern was rejected.
        message: String,
    },

    /// A handler is already bound to this scheme.
    #[error("Scheme already registered: {scheme}")]
    SchemeAlreadyRegistered {
        /// The scheme name.
        scheme: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Dispatch Errors
    // ========================================================================
    /// Captured groups disagree with the placeholder names of a pattern.
    ///
    /// Indicates a pattern compiler bug; reported, never panics.
    #[error("Match extraction failed for {path:?} against {pattern:?}: {message}")]
    MatchExtraction {
        /// The pattern source.
        pattern: String,
        /// The path being matched.
        path: String,
        /// Details.
        message: String,
    },

    /// Request body is not valid UTF-8 JSON.
    #[error("Body parse error: {message}")]
    BodyParse {
        /// Parser error message.
        message: String,
    },

    /// No route registered for method and path.
    #[error("No route matched: {method} {path}")]
    NoRouteMatched {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// Method name outside GET, POST, PUT, PATCH and DELETE.
    #[error("Unsupported method: {method:?}")]
    UnsupportedMethod {
        /// Method name as received.
        method: String,
    },

    // ========================================================================
    // Response Errors
    // ========================================================================
    /// `send` called on a response that already completed.
    #[error("Response already sent")]
    ResponseAlreadySent,

    // ========================================================================
    // Client Errors
    // ========================================================================
    /// The substrate fetch failed.
    #[error("Transport failure for {url}: {code}")]
    Transport {
        /// Target URL.
        url: String,
        /// Out-of-band error code.
        code: NetError,
    },

    /// Synchronous request attempted on the custom scheme.
    #[error("Synchronous requests are not supported for {url}")]
    UnsupportedMode {
        /// Target URL.
        url: String,
    },

    /// Operation invoked in the wrong request state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state violation.
        message: String,
    },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Storage collaborator failure.
    #[error("Storage error: {message}")]
    Storage {
        /// Underlying storage error message.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Completion channel dropped before a reply was produced.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid pattern error.
    #[inline]
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Creates a scheme already registered error.
    #[inline]
    pub fn scheme_already_registered(scheme: impl Into<String>) -> Self {
        Self::SchemeAlreadyRegistered {
            scheme: scheme.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a match extraction error.
    #[inline]
    pub fn match_extraction(
        pattern: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MatchExtraction {
            pattern: pattern.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a body parse error.
    #[inline]
    pub fn body_parse(message: impl Into<String>) -> Self {
        Self::BodyParse {
            message: message.into(),
        }
    }

    /// Creates a no route matched error.
    #[inline]
    pub fn no_route_matched(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::NoRouteMatched {
            method: method.into(),
            path: path.into(),
        }
    }

    /// Creates an unsupported method error.
    #[inline]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Creates a transport failure.
    #[inline]
    pub fn transport(url: impl Into<String>, code: NetError) -> Self {
        Self::Transport {
            url: url.into(),
            code,
        }
    }

    /// Creates an unsupported mode error.
    #[inline]
    pub fn unsupported_mode(url: impl Into<String>) -> Self {
        Self::UnsupportedMode { url: url.into() }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error was raised while registering routes or schemes.
    #[inline]
    #[must_use]
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPattern { .. } | Self::SchemeAlreadyRegistered { .. } | Self::Config { .. }
        )
    }

    /// Returns `true` if the caller sent something the router cannot accept.
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BodyParse { .. } | Self::NoRouteMatched { .. } | Self::UnsupportedMethod { .. }
        )
    }

    /// Returns `true` if this error came from the transport substrate.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::ChannelClosed(_))
    }

    /// Returns the out-of-band code carried by this error, if any.
    #[inline]
    #[must_use]
    pub fn net_error(&self) -> Option<NetError> {
        match self {
            Self::Transport { code, .. } => Some(*code),
            Self::NoRouteMatched { .. } => Some(NetError::InvalidUrl),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_display() {
        let err = Error::invalid_pattern(":a:b", "adjacent placeholders");
        assert_eq!(
            err.to_string(),
            "Invalid route pattern \":a:b\": adjacent placeholders"
        );
    }

    #[test]
    fn test_transport_display() {
        let err = Error::transport("backend:/x", NetError::InvalidUrl);
        assert_eq!(err.to_string(), "Transport failure for backend:/x: -300");
    }

    #[test]
    fn test_is_registration_error() {
        assert!(Error::invalid_pattern("*:a", "x").is_registration_error());
        assert!(Error::scheme_already_registered("backend").is_registration_error());
        assert!(!Error::body_parse("x").is_registration_error());
    }

    #[test]
    fn test_is_client_error() {
        assert!(Error::body_parse("eof").is_client_error());
        assert!(Error::no_route_matched("GET", "/").is_client_error());
        assert!(Error::unsupported_method("HEAD").is_client_error());
        assert!(!Error::ResponseAlreadySent.is_client_error());
    }

    #[test]
    fn test_net_error() {
        let err = Error::transport("backend:/x", NetError::Failed);
        assert_eq!(err.net_error(), Some(NetError::Failed));
        assert_eq!(
            Error::no_route_matched("GET", "/").net_error(),
            Some(NetError::InvalidUrl)
        );
        assert_eq!(Error::config("x").net_error(), None);
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
