//! Error taxonomy for connector calls.
//!
//! Every failure surfaces as a [`ConnectorError`]. Callers that only need the
//! uniform `{message?, statusCode?}` view use [`ConnectorError::message`] and
//! [`ConnectorError::status_code`].

use crate::response::ResponseBody;
use thiserror::Error;

/// Result alias for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Errors returned by the token manager and the request pipeline.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Token endpoint answered with a non-success status.
    #[error("Failed to get access token: {body}")]
    Auth { status: u16, body: String },

    /// Token endpoint answered 2xx but the body was not a token response.
    #[error("Failed to parse access token response: {0}")]
    InvalidTokenResponse(#[source] serde_json::Error),

    /// Resource endpoint answered with status >= 400.
    #[error("Request failed with status {status}{}", describe_message(.message))]
    Api {
        status: u16,
        message: Option<ResponseBody>,
    },

    /// Network failure or timeout; no HTTP status is available.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// `@binary` body whose remainder is not valid base64.
    #[error("Invalid binary body: {0}")]
    InvalidBody(#[from] base64::DecodeError),

    /// Base URL and path do not form a valid URL.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Caller supplied a header that cannot be sent.
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    /// Operation name not understood by this data source.
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),
}

impl ConnectorError {
    /// HTTP status associated with the failure, if one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ConnectorError::Auth { status, .. } | ConnectorError::Api { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Body-derived message, if any.
    ///
    /// Auth failures carry the raw token endpoint text; API failures carry the
    /// parsed-or-raw body (absent when the body was an empty non-string value).
    pub fn message(&self) -> Option<ResponseBody> {
        match self {
            ConnectorError::Auth { body, .. } => Some(ResponseBody::Raw(body.clone())),
            ConnectorError::Api { message, .. } => message.clone(),
            _ => None,
        }
    }

    /// True for network-level failures (including timeouts).
    pub fn is_transport(&self) -> bool {
        matches!(self, ConnectorError::Transport(_))
    }
}

fn describe_message(message: &Option<ResponseBody>) -> String {
    match message {
        Some(body) => format!(": {}", body),
        None => String::new(),
    }
}
