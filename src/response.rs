//! Response normalization.
//!
//! Resource responses are read as text, parsed as JSON when possible, and
//! folded into either a [`NormalizedResult`] or a [`ConnectorError::Api`].

use crate::error::{ConnectorError, ConnectorResult};
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Body of a response: parsed JSON when the text was valid JSON, else the raw text.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Parsed(Value),
    Raw(String),
}

impl ResponseBody {
    /// Parse `text` as JSON, falling back to the raw text. Never fails.
    pub fn parse(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Parsed(value),
            Err(_) => ResponseBody::Raw(text),
        }
    }

    /// Returns the parsed JSON value, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Parsed(value) => Some(value),
            ResponseBody::Raw(_) => None,
        }
    }

    /// Returns the raw text, if the body did not parse.
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            ResponseBody::Parsed(_) => None,
            ResponseBody::Raw(text) => Some(text),
        }
    }

    /// Whether this body is worth reporting as an error message.
    ///
    /// Strings (raw or JSON) always are. Other JSON values only when they are a
    /// non-empty object or array.
    fn is_reportable(&self) -> bool {
        match self {
            ResponseBody::Raw(_) => true,
            ResponseBody::Parsed(Value::String(_)) => true,
            ResponseBody::Parsed(Value::Object(map)) => !map.is_empty(),
            ResponseBody::Parsed(Value::Array(items)) => !items.is_empty(),
            ResponseBody::Parsed(_) => false,
        }
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Parsed(value) => write!(f, "{}", value),
            ResponseBody::Raw(text) => f.write_str(text),
        }
    }
}

/// Uniform success shape returned by every verb.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    pub response: ResponseBody,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
}

/// Envelope expected by the data-source layer: `{"data": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataResponse {
    pub data: NormalizedResult,
}

impl NormalizedResult {
    /// Wrap in the `{data: ...}` envelope.
    pub fn into_data(self) -> DataResponse {
        DataResponse { data: self }
    }
}

/// Classify a fully-read response.
///
/// The body is normalized before the status is checked so error messages are
/// built from the same parsed representation as successful results.
pub fn normalize(status: u16, headers: &HeaderMap, text: String) -> ConnectorResult<NormalizedResult> {
    let response = ResponseBody::parse(text);

    if status >= 400 {
        let message = response.is_reportable().then_some(response);
        return Err(ConnectorError::Api { status, message });
    }

    Ok(NormalizedResult {
        response,
        status_code: status,
        headers: flatten_headers(headers),
    })
}

/// Flatten response headers into a name → value map.
///
/// Repeated headers are joined with `", "`.
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}
