//! Structured request handed to route handlers.

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::RawRequest;
use crate::route::{Params, RoutePattern};

// ============================================================================
// Request
// ============================================================================

/// A matched request.
///
/// Built fresh for every dispatch and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Request {
    /// Correlation ID of the raw request.
    pub id: RequestId,

    /// Named placeholders captured from the path, in pattern order.
    pub params: Params,

    /// Parsed JSON body, `None` when no upload data was sent.
    pub body: Option<Value>,
}

impl Request {
    /// Builds a request from a raw request and the pattern it matched.
    ///
    /// # Errors
    ///
    /// - [`Error::MatchExtraction`] if the pattern cannot be re-applied to the path
    /// - [`Error::BodyParse`] if the first upload chunk is not UTF-8 JSON
    pub fn build(pattern: &RoutePattern, raw: &RawRequest) -> Result<Self> {
        let params = pattern.extract(raw.path())?;
        let body = raw
            .first_chunk()
            .map(|chunk| parse_body(&chunk.bytes))
            .transpose()?;

        Ok(Self {
            id: raw.id,
            params,
            body,
        })
    }

    /// Returns a path parameter.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Deserializes the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyParse`] if there is no body or it does not fit `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| Error::body_parse("request has no body"))?;

        T::deserialize(body).map_err(|e| Error::body_parse(e.to_string()))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Decodes a body chunk as UTF-8 JSON.
fn parse_body(bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::body_parse(e.to_string()))?;
    serde_json::from_str(text).map_err(|e| Error::body_parse(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;

    fn pattern(source: &str) -> RoutePattern {
        RoutePattern::compile(source).expect("compile")
    }

    #[test]
    fn test_build_extracts_params() {
        let raw = RawRequest::new("GET", "backend:/db/issues/7");
        let request = Request::build(&pattern("/db/issues/:id"), &raw).expect("build");

        assert_eq!(request.param("id"), Some("7"));
        assert!(request.body.is_none());
        assert_eq!(request.id, raw.id);
    }

    #[test]
    fn test_build_parses_body() {
        let raw = RawRequest::new("POST", "backend:/db/issues").with_body(r#"{"name":"Task A"}"#);
        let request = Request::build(&pattern("/db/issues"), &raw).expect("build");

        let body = request.body.expect("body");
        assert_eq!(body["name"], "Task A");
    }

    #[test]
    fn test_build_uses_first_chunk_only() {
        let mut raw = RawRequest::new("POST", "backend:/x");
        raw.upload_data = Some(vec![
            crate::protocol::UploadData::new("[1]"),
            crate::protocol::UploadData::new("not json"),
        ]);

        let request = Request::build(&pattern("/x"), &raw).expect("build");
        assert_eq!(request.body, Some(serde_json::json!([1])));
    }

    #[test]
    fn test_empty_upload_list_is_no_body() {
        let mut raw = RawRequest::new("POST", "backend:/x");
        raw.upload_data = Some(Vec::new());

        let request = Request::build(&pattern("/x"), &raw).expect("build");
        assert!(request.body.is_none());
    }

    #[test]
    fn test_invalid_json_body() {
        let raw = RawRequest::new("POST", "backend:/x").with_body("{name:");
        let err = Request::build(&pattern("/x"), &raw).unwrap_err();
        assert!(matches!(err, Error::BodyParse { .. }));
    }

    #[test]
    fn test_invalid_utf8_body() {
        let raw = RawRequest::new("POST", "backend:/x").with_body(vec![0xff, 0xfe]);
        let err = Request::build(&pattern("/x"), &raw).unwrap_err();
        assert!(matches!(err, Error::BodyParse { .. }));
    }

    #[test]
    fn test_pattern_mismatch() {
        let raw = RawRequest::new("GET", "backend:/elsewhere");
        let err = Request::build(&pattern("/db/issues/:id"), &raw).unwrap_err();
        assert!(matches!(err, Error::MatchExtraction { .. }));
    }

    #[test]
    fn test_typed_body() {
        #[derive(Deserialize)]
        struct NewIssue {
            name: String,
        }

        let raw = RawRequest::new("POST", "backend:/x").with_body(r#"{"name":"Task A"}"#);
        let request = Request::build(&pattern("/x"), &raw).expect("build");
        let issue: NewIssue = request.json().expect("typed body");
        assert_eq!(issue.name, "Task A");
    }

    #[test]
    fn test_typed_body_missing() {
        let raw = RawRequest::new("POST", "backend:/x");
        let request = Request::build(&pattern("/x"), &raw).expect("build");
        assert!(matches!(
            request.json::<Value>(),
            Err(Error::BodyParse { .. })
        ));
    }
}
