//! Request descriptors and their translation to URL, headers, and body.
//!
//! The data-source layer hands us an operation name plus a loose argument bag
//! (`path`, `params`, `headers`, `body`). Those are parsed into [`CallArgs`]
//! and bound to an [`Operation`] as a [`RequestDescriptor`].

mod body;

pub use body::{RequestBody, BINARY_MARKER};

use crate::error::{ConnectorError, ConnectorResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// HTTP verbs exposed as data-source operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Get,
        Operation::Post,
        Operation::Put,
        Operation::Patch,
        Operation::Delete,
    ];

    pub fn method(self) -> Method {
        match self {
            Operation::Get => Method::GET,
            Operation::Post => Method::POST,
            Operation::Put => Method::PUT,
            Operation::Patch => Method::PATCH,
            Operation::Delete => Method::DELETE,
        }
    }

    /// Whether requests for this verb send a body.
    pub fn carries_body(self) -> bool {
        matches!(self, Operation::Post | Operation::Put | Operation::Patch)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Post => "post",
            Operation::Put => "put",
            Operation::Patch => "patch",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConnectorError::UnknownOperation(s.to_string()))
    }
}

/// Argument bag for a single operation.
///
/// `params` and `headers` keep the order they were supplied in; duplicate
/// keys are allowed.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CallArgs {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub params: Vec<(String, String)>,
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Option<RequestBody>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an argument bag from JSON text, keeping object key order.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A fully-specified call: verb plus arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    pub operation: Operation,
    pub path: Option<String>,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl RequestDescriptor {
    /// Bind arguments to a verb. Bodies on GET/DELETE are dropped.
    pub fn new(operation: Operation, args: CallArgs) -> Self {
        let body = if operation.carries_body() {
            args.body
        } else {
            if args.body.is_some() {
                tracing::debug!(operation = %operation, "Ignoring body for operation without one");
            }
            None
        };

        Self {
            operation,
            path: args.path,
            params: args.params,
            headers: args.headers,
            body,
        }
    }

    /// Target URL: base URL + path (one leading `/` stripped) + query params.
    ///
    /// `base_url` must already end with `/`.
    pub fn url(&self, base_url: &str) -> ConnectorResult<Url> {
        let path = self.path.as_deref().unwrap_or("");
        let path = path.strip_prefix('/').unwrap_or(path);
        let mut url = Url::parse(&format!("{}{}", base_url, path))?;

        if !self.params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Request headers: JSON content type, then caller headers, then bearer auth.
    pub fn headers(&self, token: &str) -> ConnectorResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConnectorError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ConnectorError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ConnectorError::InvalidHeader(AUTHORIZATION.to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        Ok(headers)
    }

    /// Encoded body bytes, or `None` when nothing should be sent.
    pub fn encoded_body(&self) -> ConnectorResult<Option<Vec<u8>>> {
        self.body.as_ref().map(RequestBody::encode).transpose()
    }
}

/// Deserialize a JSON object (or list of pairs) into ordered key/value pairs.
fn ordered_pairs<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PairsVisitor;

    impl<'de> Visitor<'de> for PairsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of strings or a list of [key, value] pairs")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, String>()? {
                pairs.push((key, value));
            }
            Ok(pairs)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut pairs = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(pair) = seq.next_element::<(String, String)>()? {
                pairs.push(pair);
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_any(PairsVisitor)
}
