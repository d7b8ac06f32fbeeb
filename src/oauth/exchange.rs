//! OAuth client-credentials exchange.
//!
//! Handles trading a client ID/secret pair for an access token.

use crate::error::{ConnectorError, ConnectorResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// Seconds subtracted from `expires_in` so a token is never used right at its end of life.
pub const EXPIRY_BUFFER_SECS: i64 = 300;

/// Form body for the token endpoint.
#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
}

/// OAuth token response (standard OAuth 2.0)
#[derive(Deserialize, Debug)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    /// Any JSON number is accepted; fractional seconds are truncated.
    #[serde(default)]
    pub expires_in: Option<f64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Access token plus the instant after which it must not be used.
#[derive(Clone, Debug)]
pub(crate) struct IssuedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Client identity sent to the token endpoint.
pub(crate) struct ClientCredentials<'a> {
    pub token_url: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub scope: Option<&'a str>,
}

impl ClientCredentials<'_> {
    /// `Basic base64(client_id:client_secret)`
    pub fn basic_authorization(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", BASE64.encode(raw))
    }

    /// `grant_type=client_credentials[&scope=...]`, spaces encoded as `+`.
    pub fn form_body(&self) -> String {
        let request = TokenRequest {
            grant_type: "client_credentials",
            scope: self.scope,
        };
        // Two string fields cannot fail to encode
        serde_urlencoded::to_string(&request).unwrap_or_default()
    }
}

/// Expiry for a token issued at `now` with the given lifetime.
///
/// A missing lifetime yields `now`, which is never considered valid.
/// Lifetimes beyond what `chrono` can represent are clamped: far-future
/// values to [`DateTime::<Utc>::MAX_UTC`], far-past values to `now`.
pub(crate) fn expires_at(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    let Some(seconds) = expires_in else {
        return now;
    };
    TimeDelta::try_seconds(seconds.saturating_sub(EXPIRY_BUFFER_SECS))
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(if seconds > 0 { DateTime::<Utc>::MAX_UTC } else { now })
}

/// Whole seconds of a token lifetime; `as` saturates out-of-range floats.
fn lifetime_secs(expires_in: Option<f64>) -> Option<i64> {
    expires_in.map(|seconds| seconds.trunc() as i64)
}

/// POST the client-credentials grant and parse the token response.
///
/// Non-success statuses become [`ConnectorError::Auth`] carrying the body text.
pub(crate) async fn exchange_client_credentials(
    client: &reqwest::Client,
    credentials: &ClientCredentials<'_>,
) -> ConnectorResult<IssuedToken> {
    tracing::debug!(token_url = %credentials.token_url, "Requesting access token");

    let response = client
        .post(credentials.token_url)
        .header(AUTHORIZATION, credentials.basic_authorization())
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(credentials.form_body())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await?;
        tracing::warn!(status = status.as_u16(), "Token exchange rejected");
        return Err(ConnectorError::Auth {
            status: status.as_u16(),
            body,
        });
    }

    let text = response.text().await?;
    let token_response: TokenResponse =
        serde_json::from_str(&text).map_err(ConnectorError::InvalidTokenResponse)?;

    if token_response.expires_in.is_none() {
        tracing::warn!("Token response has no expires_in; token will not be reused");
    }

    tracing::debug!(
        expires_in = ?token_response.expires_in,
        token_type = ?token_response.token_type,
        scope = ?token_response.scope,
        "Token exchange successful"
    );

    Ok(IssuedToken {
        expires_at: expires_at(Utc::now(), lifetime_secs(token_response.expires_in)),
        access_token: token_response.access_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(scope: Option<&str>) -> ClientCredentials<'_> {
        ClientCredentials {
            token_url: "https://rest-staging2.zuora.com/oauth/token",
            client_id: "test-client-id",
            client_secret: "test-client-secret",
            scope,
        }
    }

    #[test]
    fn test_basic_authorization() {
        let header = credentials(None).basic_authorization();
        assert_eq!(
            header,
            format!("Basic {}", BASE64.encode("test-client-id:test-client-secret"))
        );
    }

    #[test]
    fn test_form_body_without_scope() {
        assert_eq!(credentials(None).form_body(), "grant_type=client_credentials");
    }

    #[test]
    fn test_form_body_encodes_scope_spaces_as_plus() {
        assert_eq!(
            credentials(Some("read write")).form_body(),
            "grant_type=client_credentials&scope=read+write"
        );
    }

    #[test]
    fn test_expiry_applies_five_minute_buffer() {
        let now = Utc::now();
        assert_eq!(expires_at(now, Some(3600)), now + TimeDelta::seconds(3300));
    }

    #[test]
    fn test_short_lifetime_is_already_expired() {
        let now = Utc::now();
        assert!(expires_at(now, Some(120)) < now);
        assert_eq!(expires_at(now, None), now);
    }

    #[test]
    fn test_out_of_range_lifetime_is_clamped() {
        let now = Utc::now();
        assert_eq!(expires_at(now, Some(i64::MAX)), DateTime::<Utc>::MAX_UTC);
        assert_eq!(expires_at(now, Some(i64::MIN)), now);
        assert_eq!(expires_at(now, Some(i64::MIN + 1)), now);
    }

    #[test]
    fn test_token_response_deserialization() {
        let json = r#"{
            "access_token": "test-access-token",
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": "read write"
        }"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "test-access-token");
        assert_eq!(lifetime_secs(response.expires_in), Some(3600));
        assert_eq!(response.token_type.as_deref(), Some("Bearer"));
        assert_eq!(response.scope.as_deref(), Some("read write"));
    }

    #[test]
    fn test_token_response_minimal() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "token_12345"}"#).unwrap();
        assert_eq!(response.access_token, "token_12345");
        assert_eq!(response.expires_in, None);
    }

    #[test]
    fn test_token_response_accepts_fractional_lifetime() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "T", "expires_in": 3600.7}"#).unwrap();
        assert_eq!(lifetime_secs(response.expires_in), Some(3600));

        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "T", "expires_in": 9223372036854775807}"#)
                .unwrap();
        assert_eq!(lifetime_secs(response.expires_in), Some(i64::MAX));
    }
}
