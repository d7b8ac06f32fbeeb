//! Connector configuration.
//!
//! A Zuora data source is configured with secret credentials and public
//! settings, mirroring how the data-source record stores them:
//!
//! ```toml
//! [credentials]
//! clientId = "..."
//! clientSecret = "..."
//!
//! [settings]
//! baseUrl = "https://rest-staging2.zuora.com"
//! accessTokenUrl = "https://rest-staging2.zuora.com/oauth/token"
//! scope = "read write"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://rest-staging2.zuora.com";
pub const DEFAULT_ACCESS_TOKEN_URL: &str = "https://rest-staging2.zuora.com/oauth/token";
pub const DEFAULT_TIMEOUT_SECS: u64 = 175;

/// Complete configuration for one Zuora data source.
#[derive(Debug, Clone, Deserialize)]
pub struct ZuoraSource {
    pub credentials: ZuoraCredentials,
    #[serde(default)]
    pub settings: ZuoraSettings,
}

/// OAuth client credentials.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZuoraCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ZuoraCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZuoraCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Endpoint settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZuoraSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_access_token_url")]
    pub access_token_url: String,
    /// Space-delimited OAuth scopes; empty means none.
    #[serde(default)]
    pub scope: String,
    /// Per-request timeout for both the token exchange and API calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_access_token_url() -> String {
    DEFAULT_ACCESS_TOKEN_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ZuoraSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token_url: default_access_token_url(),
            scope: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ZuoraSettings {
    /// Base URL guaranteed to end with `/`.
    pub fn normalized_base_url(&self) -> String {
        if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        }
    }

    /// Configured scope, or `None` when blank.
    pub fn scope(&self) -> Option<&str> {
        Some(self.scope.as_str()).filter(|s| !s.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ZuoraSource {
    /// Load config from environment variables.
    ///
    /// Required: `ZUORA_CLIENT_ID`, `ZUORA_CLIENT_SECRET`.
    /// Optional: `ZUORA_BASE_URL`, `ZUORA_ACCESS_TOKEN_URL`, `ZUORA_SCOPE`,
    /// `ZUORA_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let client_id =
            std::env::var("ZUORA_CLIENT_ID").context("ZUORA_CLIENT_ID not set")?;
        let client_secret =
            std::env::var("ZUORA_CLIENT_SECRET").context("ZUORA_CLIENT_SECRET not set")?;

        let timeout_secs = match std::env::var("ZUORA_TIMEOUT_SECS") {
            Ok(value) => value
                .parse()
                .context("ZUORA_TIMEOUT_SECS must be a whole number of seconds")?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            credentials: ZuoraCredentials {
                client_id,
                client_secret,
            },
            settings: ZuoraSettings {
                base_url: std::env::var("ZUORA_BASE_URL").unwrap_or_else(|_| default_base_url()),
                access_token_url: std::env::var("ZUORA_ACCESS_TOKEN_URL")
                    .unwrap_or_else(|_| default_access_token_url()),
                scope: std::env::var("ZUORA_SCOPE").unwrap_or_default(),
                timeout_secs,
            },
        })
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<ZuoraSource> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse config file at {}", path))
}
