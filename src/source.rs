use crate::error::ConnectorResult;
use crate::request::{CallArgs, Operation};
use crate::response::NormalizedResult;
use async_trait::async_trait;

/// Data-source interface used by the operation layer.
///
/// Implementations own their authentication state; callers only supply an
/// operation and its arguments.
///
/// # Example
/// ```no_run
/// use zuora_connector::{make_zuora_fetcher, load_config, CallArgs, DataSource, Operation};
/// use std::sync::Arc;
///
/// # async fn run() -> anyhow::Result<()> {
/// let source = load_config("zuora.toml")?;
/// let fetcher: Arc<dyn DataSource> = Arc::new(make_zuora_fetcher(&source)?);
///
/// let result = fetcher
///     .execute(Operation::Get, CallArgs::new().path("v1/accounts"))
///     .await?;
/// println!("{} {}", result.status_code, result.response);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Identifier of the data-source kind (e.g. "zuora").
    fn name(&self) -> &str;

    /// Run one operation against the remote API.
    ///
    /// # Returns
    /// * `Ok(NormalizedResult)` - status < 400, body parsed or raw
    /// * `Err(ConnectorError)` - auth, API (status >= 400), or transport failure
    async fn execute(&self, operation: Operation, args: CallArgs)
        -> ConnectorResult<NormalizedResult>;

    /// Run an operation named by the metadata layer (`"get"`, `"post"`, ...).
    async fn execute_named(&self, operation: &str, args: CallArgs) -> ConnectorResult<NormalizedResult> {
        let operation: Operation = operation.parse()?;
        self.execute(operation, args).await
    }
}
