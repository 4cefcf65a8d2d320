//! Single-use response sink handed to route handlers.
//!
//! # Example
//!
//! ```ignore
//! router.get("/db/issues", |_req, res| {
//!     tokio::spawn(async move {
//!         let rows = load_issues().await;
//!         let _ = res.json(&rows);
//!     });
//! })?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Completion, MIME_JSON, MIME_TEXT, ProtocolReply, ProtocolResponse};

// ============================================================================
// Payload
// ============================================================================

/// Data accepted by [`Response::send`].
///
/// Strings and scalars travel as text; `null`, arrays and objects travel
/// as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured value, serialized as JSON.
    Json(Value),
    /// Plain text.
    Text(String),
}

impl Payload {
    /// Mime type declared for this payload.
    #[inline]
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Json(_) => MIME_JSON,
            Self::Text(_) => MIME_TEXT,
        }
    }

    /// Serializes into a buffered protocol response.
    #[must_use]
    pub fn into_protocol_response(self) -> ProtocolResponse {
        let mime_type = self.mime_type();
        let data = match self {
            Self::Json(value) => value.to_string().into_bytes(),
            Self::Text(text) => text.into_bytes(),
        };
        ProtocolResponse::new(mime_type, data)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Number(number) => Self::Text(number.to_string()),
            Value::Bool(flag) => Self::Text(flag.to_string()),
            other @ (Value::Null | Value::Array(_) | Value::Object(_)) => Self::Json(other),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

// ============================================================================
// Response
// ============================================================================

/// Response capability for one request.
///
/// Only the first [`send`](Self::send) has effect; later calls are
/// rejected with [`Error::ResponseAlreadySent`].
pub struct Response {
    /// Correlation ID of the request being answered.
    id: RequestId,
    /// Completion, taken on first send.
    completion: Mutex<Option<Completion>>,
}

impl Response {
    /// Creates a response that reports to `completion`.
    #[must_use]
    pub fn new(completion: Completion) -> Self {
        Self::with_id(RequestId::generate(), completion)
    }

    /// Creates a response tagged with the request ID it answers.
    #[must_use]
    pub fn with_id(id: RequestId, completion: Completion) -> Self {
        Self {
            id,
            completion: Mutex::new(Some(completion)),
        }
    }

    /// Sends `data` and completes the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseAlreadySent`] on every call after the first.
    pub fn send(&self, data: impl Into<Payload>) -> Result<()> {
        let Some(complete) = self.completion.lock().take() else {
            warn!(id = %self.id, "Response already sent, dropping payload");
            return Err(Error::ResponseAlreadySent);
        };

        let response = data.into().into_protocol_response();
        debug!(
            id = %self.id,
            mime_type = %response.mime_type,
            bytes = response.data.len(),
            "Response sent"
        );

        complete(ProtocolReply::Response(response));
        Ok(())
    }

    /// Serializes `value` and sends it.
    ///
    /// Classification follows [`Payload`]'s `From<Value>`.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if `value` cannot be serialized
    /// - [`Error::ResponseAlreadySent`] if already sent
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.send(value)
    }

    /// Returns `true` once a payload has been sent.
    #[inline]
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.completion.lock().is_none()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("id", &self.id)
            .field("sent", &self.is_sent())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serde_json::json;

    /// Response whose replies are collected into a shared vector.
    fn capture() -> (Response, Arc<Mutex<Vec<ProtocolReply>>>) {
        let replies = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&replies);
        let response = Response::new(Box::new(move |reply: ProtocolReply| {
            sink.lock().push(reply);
        }));
        (response, replies)
    }

    #[test]
    fn test_send_object_is_json() {
        let (response, replies) = capture();
        response
            .send(json!({ "id": 1, "name": "x" }))
            .expect("send");

        let replies = replies.lock();
        let sent = replies[0].response().expect("response");
        assert_eq!(sent.mime_type, "application/json");

        let decoded: Value = serde_json::from_slice(&sent.data).expect("decode");
        assert_eq!(decoded, json!({ "id": 1, "name": "x" }));
    }

    #[test]
    fn test_send_str_is_text() {
        let (response, replies) = capture();
        response.send("hello").expect("send");

        let replies = replies.lock();
        let sent = replies[0].response().expect("response");
        assert_eq!(sent.mime_type, "application/text");
        assert_eq!(sent.data, b"hello");
    }

    #[test]
    fn test_value_classification() {
        assert!(matches!(Payload::from(json!("s")), Payload::Text(t) if t == "s"));
        assert!(matches!(Payload::from(json!(42)), Payload::Text(t) if t == "42"));
        assert!(matches!(Payload::from(json!(true)), Payload::Text(t) if t == "true"));
        assert!(matches!(Payload::from(json!(null)), Payload::Json(Value::Null)));
        assert!(matches!(Payload::from(json!([1, 2])), Payload::Json(_)));
    }

    #[test]
    fn test_json_helper_serializes_structs() {
        #[derive(Serialize)]
        struct Issue {
            id: i64,
            name: &'static str,
        }

        let (response, replies) = capture();
        response.json(&Issue { id: 3, name: "t" }).expect("send");

        let replies = replies.lock();
        let sent = replies[0].response().expect("response");
        assert!(sent.is_json());
        assert_eq!(sent.data, br#"{"id":3,"name":"t"}"#);
    }

    #[test]
    fn test_second_send_rejected() {
        let (response, replies) = capture();
        assert!(!response.is_sent());

        response.send("first").expect("send");
        assert!(response.is_sent());

        let err = response.send("second").unwrap_err();
        assert!(matches!(err, Error::ResponseAlreadySent));

        let replies = replies.lock();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].response().expect("response").data, b"first");
    }

    #[test]
    fn test_debug_reports_state() {
        let (response, _) = capture();
        assert!(format!("{response:?}").contains("sent: false"));
    }
}
