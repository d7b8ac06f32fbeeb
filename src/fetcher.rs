//! Authenticated request pipeline for the Zuora REST API.

use crate::config::ZuoraSource;
use crate::error::{ConnectorError, ConnectorResult};
use crate::oauth::TokenManager;
use crate::request::{CallArgs, Operation, RequestDescriptor};
use crate::response::{normalize, NormalizedResult};
use crate::source::DataSource;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Create a fetcher for a configured Zuora data source.
pub fn make_zuora_fetcher(source: &ZuoraSource) -> ConnectorResult<ZuoraFetcher> {
    ZuoraFetcher::new(source)
}

/// HTTP client for a Zuora tenant.
///
/// Each verb builds the URL, attaches a bearer token from the
/// [`TokenManager`], sends the request, and normalizes the response.
/// Safe to share across tasks; the token cache is the only mutable state.
#[derive(Debug)]
pub struct ZuoraFetcher {
    base_url: String,
    http_client: reqwest::Client,
    token_manager: TokenManager,
}

impl ZuoraFetcher {
    /// Create a fetcher whose requests time out after the configured duration.
    pub fn new(source: &ZuoraSource) -> ConnectorResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(source.settings.timeout())
            .build()?;
        Ok(Self::with_client(http_client, source))
    }

    /// Create a fetcher around an existing HTTP client.
    ///
    /// The client is shared by the token exchange and API calls.
    pub fn with_client(http_client: reqwest::Client, source: &ZuoraSource) -> Self {
        Self {
            base_url: source.settings.normalized_base_url(),
            token_manager: TokenManager::new(http_client.clone(), source),
            http_client,
        }
    }

    /// Base URL with trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.token_manager
    }

    pub async fn get(&self, args: CallArgs) -> ConnectorResult<NormalizedResult> {
        self.call(RequestDescriptor::new(Operation::Get, args)).await
    }

    pub async fn post(&self, args: CallArgs) -> ConnectorResult<NormalizedResult> {
        self.call(RequestDescriptor::new(Operation::Post, args)).await
    }

    pub async fn put(&self, args: CallArgs) -> ConnectorResult<NormalizedResult> {
        self.call(RequestDescriptor::new(Operation::Put, args)).await
    }

    pub async fn patch(&self, args: CallArgs) -> ConnectorResult<NormalizedResult> {
        self.call(RequestDescriptor::new(Operation::Patch, args)).await
    }

    pub async fn delete(&self, args: CallArgs) -> ConnectorResult<NormalizedResult> {
        self.call(RequestDescriptor::new(Operation::Delete, args)).await
    }

    /// Send one authenticated request and normalize its response.
    ///
    /// Token failures are returned unchanged; nothing is retried.
    pub async fn call(&self, descriptor: RequestDescriptor) -> ConnectorResult<NormalizedResult> {
        let url = descriptor.url(&self.base_url)?;
        let token = self.token_manager.get_valid_token().await?;
        let headers = descriptor.headers(&token)?;
        let body = descriptor.encoded_body()?;

        debug!(
            operation = %descriptor.operation,
            path = %url.path(),
            has_body = body.is_some(),
            "Sending request"
        );

        let mut request = self
            .http_client
            .request(descriptor.operation.method(), url)
            .headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let text = response.text().await?;

        let result = normalize(status, &response_headers, text);
        if let Err(ConnectorError::Api { status, .. }) = &result {
            warn!(operation = %descriptor.operation, status = *status, "Request failed");
        }
        result
    }
}

#[async_trait]
impl DataSource for ZuoraFetcher {
    fn name(&self) -> &str {
        "zuora"
    }

    async fn execute(
        &self,
        operation: Operation,
        args: CallArgs,
    ) -> ConnectorResult<NormalizedResult> {
        self.call(RequestDescriptor::new(operation, args)).await
    }
}
