//! Wire types exchanged over a custom scheme.
//!
//! # Format
//!
//! | Direction | Type | Content |
//! |-----------|------|---------|
//! | Caller → Handler | [`RawRequest`] | `method`, `<scheme>:<path>` URL, headers, upload data |
//! | Handler → Caller | [`ProtocolReply::Response`] | `{ mimeType, data }` |
//! | Handler → Caller | [`ProtocolReply::Error`] | out-of-band [`NetError`] code |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::identifiers::RequestId;

// ============================================================================
// Constants
// ============================================================================

/// Mime type declared for structured payloads.
pub const MIME_JSON: &str = "application/json";

/// Mime type declared for text payloads.
pub const MIME_TEXT: &str = "application/text";

// ============================================================================
// Types
// ============================================================================

/// Completion callback handed to a protocol handler with each request.
///
/// Must be called at most once; consuming it by value enforces that.
pub type Completion = Box<dyn FnOnce(ProtocolReply) + Send>;

// ============================================================================
// UploadData
// ============================================================================

/// One chunk of request body bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadData {
    /// Raw chunk bytes.
    pub bytes: Vec<u8>,
}

impl UploadData {
    /// Creates a chunk from bytes.
    #[inline]
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

// ============================================================================
// RawRequest
// ============================================================================

/// A request as it arrives from the substrate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    /// Correlation ID for logging.
    pub id: RequestId,

    /// Method wire name (`GET`, `POST`, ...).
    pub method: String,

    /// Full target, `<scheme>:<path>`.
    pub url: String,

    /// Referrer URL, empty when absent.
    #[serde(default)]
    pub referrer: String,

    /// Request headers.
    #[serde(default)]
    pub headers: FxHashMap<String, String>,

    /// Body chunks, `None` when the request carries no body.
    #[serde(default)]
    pub upload_data: Option<Vec<UploadData>>,
}

impl RawRequest {
    /// Creates a body-less request.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: RequestId::generate(),
            method: method.into(),
            url: url.into(),
            referrer: String::new(),
            headers: FxHashMap::default(),
            upload_data: None,
        }
    }

    /// Adds a header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attaches a single body chunk.
    #[inline]
    #[must_use]
    pub fn with_body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.upload_data = Some(vec![UploadData::new(bytes)]);
        self
    }

    /// Returns the scheme part of the URL, if the URL has one.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.url.split_once(':').map(|(scheme, _)| scheme)
    }

    /// Returns everything after the first `:` of the URL.
    ///
    /// The whole URL is returned when it contains no `:`.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url
            .split_once(':')
            .map_or(self.url.as_str(), |(_, path)| path)
    }

    /// Returns the first body chunk, if any.
    #[inline]
    #[must_use]
    pub fn first_chunk(&self) -> Option<&UploadData> {
        self.upload_data.as_ref().and_then(|chunks| chunks.first())
    }
}

// ============================================================================
// ProtocolResponse
// ============================================================================

/// A buffered response: declared mime type plus bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolResponse {
    /// Declared content type.
    pub mime_type: String,

    /// Payload bytes.
    pub data: Vec<u8>,
}

impl ProtocolResponse {
    /// Creates a response.
    #[inline]
    #[must_use]
    pub fn new(mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Returns `true` if the payload was declared as JSON.
    #[inline]
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mime_type == MIME_JSON
    }
}

// ============================================================================
// NetError
// ============================================================================

/// Out-of-band transport error codes.
///
/// Values follow the negative network error numbering used by browser
/// substrates so they can be forwarded unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum NetError {
    /// Generic dispatch failure.
    Failed,
    /// No route matched the request.
    InvalidUrl,
    /// No handler registered for the scheme.
    UnknownUrlScheme,
}

impl NetError {
    /// Returns the integer code.
    #[inline]
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Failed => -2,
            Self::InvalidUrl => -300,
            Self::UnknownUrlScheme => -302,
        }
    }

    /// Looks up a code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -2 => Some(Self::Failed),
            -300 => Some(Self::InvalidUrl),
            -302 => Some(Self::UnknownUrlScheme),
            _ => None,
        }
    }
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<NetError> for i32 {
    fn from(err: NetError) -> Self {
        err.code()
    }
}

impl TryFrom<i32> for NetError {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown net error code {code}"))
    }
}

// ============================================================================
// ProtocolReply
// ============================================================================

/// What a protocol handler hands back through its [`Completion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProtocolReply {
    /// Buffered payload.
    Response(ProtocolResponse),
    /// Out-of-band failure code.
    Error(NetError),
}

impl ProtocolReply {
    /// Returns the response payload, if this is not an error.
    #[inline]
    #[must_use]
    pub fn response(&self) -> Option<&ProtocolResponse> {
        match self {
            Self::Response(response) => Some(response),
            Self::Error(_) => None,
        }
    }

    /// Returns the error code, if this is an error.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<NetError> {
        match self {
            Self::Response(_) => None,
            Self::Error(code) => Some(*code),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
