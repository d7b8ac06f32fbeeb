//! Request body variants and their wire encoding.

use crate::error::ConnectorResult;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Prefix marking a string body whose remainder is base64-encoded binary.
pub const BINARY_MARKER: &str = "@binary";

/// Body supplied by the caller.
///
/// Absence is modeled as `Option<RequestBody>::None` on the descriptor.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// Structured value, sent as its JSON serialization.
    Json(Value),
    /// String sent verbatim.
    Text(String),
    /// Base64 payload (marker already stripped), decoded before sending.
    Binary(String),
}

impl RequestBody {
    /// Classify a raw string body, recognizing the `@binary` marker.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        match text.strip_prefix(BINARY_MARKER) {
            Some(encoded) => RequestBody::Binary(encoded.to_string()),
            None => RequestBody::Text(text),
        }
    }

    /// Bytes to put on the wire.
    pub fn encode(&self) -> ConnectorResult<Vec<u8>> {
        match self {
            RequestBody::Json(value) => Ok(value.to_string().into_bytes()),
            RequestBody::Text(text) => Ok(text.clone().into_bytes()),
            RequestBody::Binary(encoded) => Ok(BASE64.decode(encoded.trim())?),
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => RequestBody::from_text(text),
            other => RequestBody::Json(other),
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::from_text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::from_text(text)
    }
}

impl<'de> Deserialize<'de> for RequestBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(RequestBody::from)
    }
}
