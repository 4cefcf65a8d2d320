//! Substrate-level fetch primitive.
//!
//! [`Fetch`] is what the client bridge calls instead of the network. The
//! [`ProtocolRegistry`] implements it by dispatching straight into the
//! bound scheme handler.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{ProtocolRegistry, ProtocolReply, RawRequest};

// ============================================================================
// Constants
// ============================================================================

/// Status reported for every buffered reply.
const STATUS_OK: u16 = 200;

/// Status text reported for every buffered reply.
const STATUS_TEXT_OK: &str = "OK";

// ============================================================================
// FetchRequest
// ============================================================================

/// A request issued through a [`Fetch`] primitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    /// Method wire name.
    pub method: String,
    /// Target URL.
    pub url: String,
    /// Request headers.
    pub headers: FxHashMap<String, String>,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    /// Converts into the raw request the substrate delivers.
    #[must_use]
    pub fn into_raw(self) -> RawRequest {
        let mut raw = RawRequest::new(self.method, self.url);
        raw.headers = self.headers;
        match self.body {
            Some(body) => raw.with_body(body),
            None => raw,
        }
    }
}

// ============================================================================
// FetchResponse
// ============================================================================

/// Result of a completed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Status code.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Final URL.
    pub url: String,
    /// Declared content type.
    pub content_type: String,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Decodes the body as text, replacing invalid UTF-8 sequences.
    #[inline]
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ============================================================================
// Fetch
// ============================================================================

/// Asynchronous fetch primitive.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Performs one request. No retries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the substrate signals a failure.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

#[async_trait]
impl<T: Fetch + ?Sized> Fetch for Arc<T> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        (**self).fetch(request).await
    }
}

#[async_trait]
impl Fetch for ProtocolRegistry {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let url = request.url.clone();

        match self.dispatch(request.into_raw()).await? {
            ProtocolReply::Response(response) => Ok(FetchResponse {
                status: STATUS_OK,
                status_text: STATUS_TEXT_OK.to_string(),
                url,
                content_type: response.mime_type,
                body: response.data,
            }),
            ProtocolReply::Error(code) => {
                debug!(%url, %code, "Fetch failed");
                Err(Error::transport(url, code))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
