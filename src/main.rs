use anyhow::{bail, Context, Result};
use tracing::info;
use zuora_connector::{load_config, make_zuora_fetcher, CallArgs, DataSource, ZuoraSource};

const USAGE: &str = "usage: zuora-connector <get|post|put|patch|delete> [path] [body]";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zuora_connector=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(operation) = args.next() else {
        bail!(USAGE);
    };
    let path = args.next();
    let body = args.next();

    // ZUORA_CONFIG points at a TOML file; otherwise read ZUORA_* variables
    let source = match std::env::var("ZUORA_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => ZuoraSource::from_env()?,
    };

    info!(
        base_url = %source.settings.base_url,
        operation = %operation,
        "Configuration loaded"
    );

    let fetcher = make_zuora_fetcher(&source).context("Failed to build HTTP client")?;

    let mut call_args = CallArgs::new();
    call_args.path = path;
    if let Some(body) = body {
        // JSON bodies are sent structured; anything else as a raw string
        call_args.body = Some(match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => value.into(),
            Err(_) => body.into(),
        });
    }

    let result = fetcher
        .execute_named(&operation, call_args)
        .await
        .with_context(|| format!("{} request failed", operation))?;

    println!("{}", serde_json::to_string_pretty(&result.into_data())?);
    Ok(())
}
