//! Access token lifecycle.
//!
//! [`TokenManager`] owns the cached client-credentials token for one connector
//! instance. The cache is only reachable through
//! [`TokenManager::get_valid_token`]:
//! 1. Cached token whose expiry is still ahead → returned, no network call
//! 2. Otherwise exchange client credentials at the token endpoint
//! 3. Success replaces the cache; failure leaves it untouched
//!
//! The cache sits behind an async mutex held across the exchange, so callers
//! arriving while a refresh is in flight wait for it instead of starting
//! their own.

mod exchange;

use self::exchange::{exchange_client_credentials, ClientCredentials, IssuedToken};
use crate::config::ZuoraSource;
use crate::error::ConnectorResult;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Caches and refreshes the access token for one set of client credentials.
pub struct TokenManager {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
    cached: Mutex<Option<IssuedToken>>,
}

impl TokenManager {
    /// Creates a manager with an empty cache.
    pub fn new(http_client: reqwest::Client, source: &ZuoraSource) -> Self {
        Self {
            http_client,
            token_url: source.settings.access_token_url.clone(),
            client_id: source.credentials.client_id.clone(),
            client_secret: source.credentials.client_secret.clone(),
            scope: source.settings.scope().map(str::to_string),
            cached: Mutex::new(None),
        }
    }

    /// Returns a token that is valid right now, exchanging credentials if needed.
    pub async fn get_valid_token(&self) -> ConnectorResult<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.access_token.clone());
            }
            debug!(expired_at = %token.expires_at, "Cached access token expired");
        }

        let issued =
            exchange_client_credentials(&self.http_client, &self.client_credentials()).await?;
        info!(expires_at = %issued.expires_at, "Access token acquired");

        let access_token = issued.access_token.clone();
        *cached = Some(issued);
        Ok(access_token)
    }

    /// Expiry of the cached token, if one has been issued.
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.cached.lock().await.as_ref().map(|token| token.expires_at)
    }

    fn client_credentials(&self) -> ClientCredentials<'_> {
        ClientCredentials {
            token_url: &self.token_url,
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            scope: self.scope.as_deref(),
        }
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ZuoraCredentials, ZuoraSettings};
    use crate::error::ConnectorError;
    use chrono::Duration;
    use mockito::{Matcher, Server, ServerGuard};
    use std::sync::Arc;

    fn manager_for(server: &ServerGuard, scope: &str) -> TokenManager {
        let source = ZuoraSource {
            credentials: ZuoraCredentials {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
            },
            settings: ZuoraSettings {
                base_url: server.url(),
                access_token_url: format!("{}/oauth/token", server.url()),
                scope: scope.to_string(),
                ..ZuoraSettings::default()
            },
        };
        TokenManager::new(reqwest::Client::new(), &source)
    }

    async fn seed(manager: &TokenManager, token: &str, expires_at: DateTime<Utc>) {
        *manager.cached.lock().await = Some(IssuedToken {
            access_token: token.to_string(),
            expires_at,
        });
    }

    #[tokio::test]
    async fn test_unexpired_token_skips_exchange() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .expect(0)
            .create_async()
            .await;

        let manager = manager_for(&server, "");
        seed(&manager, "cached-token", Utc::now() + Duration::seconds(60)).await;

        assert_eq!(manager.get_valid_token().await.unwrap(), "cached-token");
        assert_eq!(manager.get_valid_token().await.unwrap(), "cached-token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_request_shape_and_expiry() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_header(
                "authorization",
                "Basic dGVzdC1jbGllbnQtaWQ6dGVzdC1jbGllbnQtc2VjcmV0",
            )
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body("grant_type=client_credentials&scope=read+write")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"T","token_type":"Bearer","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let manager = manager_for(&server, "read write");
        let before = Utc::now();
        let token = manager.get_valid_token().await.unwrap();
        let after = Utc::now();

        assert_eq!(token, "T");
        let expires_at = manager.expires_at().await.unwrap();
        assert!(expires_at >= before + Duration::seconds(3300));
        assert!(expires_at <= after + Duration::seconds(3300));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_token_triggers_single_exchange() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::Exact("grant_type=client_credentials".to_string()))
            .with_status(200)
            .with_body(r#"{"access_token":"fresh","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let manager = manager_for(&server, "");
        seed(&manager, "stale", Utc::now() - Duration::seconds(1)).await;

        assert_eq!(manager.get_valid_token().await.unwrap(), "fresh");
        assert_eq!(manager.get_valid_token().await.unwrap(), "fresh");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_short_lived_token_is_exchanged_every_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body(r#"{"access_token":"short","expires_in":200}"#)
            .expect(2)
            .create_async()
            .await;

        let manager = manager_for(&server, "");
        manager.get_valid_token().await.unwrap();
        manager.get_valid_token().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_exchange_keeps_previous_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(401)
            .with_body("Invalid client credentials")
            .create_async()
            .await;

        let manager = manager_for(&server, "");
        let stale_expiry = Utc::now() - Duration::seconds(5);
        seed(&manager, "stale", stale_expiry).await;

        let err = manager.get_valid_token().await.unwrap_err();
        match err {
            ConnectorError::Auth { status, ref body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Invalid client credentials");
            }
            ref other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("Invalid client credentials"));

        let cached = manager.cached.lock().await;
        let cached = cached.as_ref().unwrap();
        assert_eq!(cached.access_token, "stale");
        assert_eq!(cached.expires_at, stale_expiry);
    }

    #[tokio::test]
    async fn test_huge_lifetime_is_cached_without_panic() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body(r#"{"access_token":"T","expires_in":9223372036854775807}"#)
            .expect(1)
            .create_async()
            .await;

        let manager = manager_for(&server, "");
        assert_eq!(manager.get_valid_token().await.unwrap(), "T");
        assert_eq!(manager.get_valid_token().await.unwrap(), "T");
        assert_eq!(manager.expires_at().await, Some(DateTime::<Utc>::MAX_UTC));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fractional_lifetime_is_accepted() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body(r#"{"access_token":"T","expires_in":3600.0}"#)
            .create_async()
            .await;

        let manager = manager_for(&server, "");
        let before = Utc::now();
        assert_eq!(manager.get_valid_token().await.unwrap(), "T");
        let expires_at = manager.expires_at().await.unwrap();
        assert!(expires_at >= before + Duration::seconds(3300));
    }

    #[tokio::test]
    async fn test_unparseable_token_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let manager = manager_for(&server, "");
        let err = manager.get_valid_token().await.unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidTokenResponse(_)));
        assert!(manager.expires_at().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body(r#"{"access_token":"shared","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let manager = Arc::new(manager_for(&server, ""));
        let calls = (0..8).map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.get_valid_token().await })
        });

        for result in futures::future::join_all(calls).await {
            assert_eq!(result.unwrap().unwrap(), "shared");
        }
        mock.assert_async().await;
    }

    #[test]
    fn test_debug_redacts_secret() {
        let server_url = "http://localhost:1";
        let source = ZuoraSource {
            credentials: ZuoraCredentials {
                client_id: "id".to_string(),
                client_secret: "super-secret".to_string(),
            },
            settings: ZuoraSettings {
                base_url: server_url.to_string(),
                access_token_url: format!("{}/oauth/token", server_url),
                ..ZuoraSettings::default()
            },
        };
        let manager = TokenManager::new(reqwest::Client::new(), &source);
        let debug = format!("{:?}", manager);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
