use std::sync::Arc;

use anyhow::Result;
use testapps::stress::{self, CompletionCounter, StressConfig};
use testapps::workflows::basic;
use testapps::{backend, config, http, init_telemetry, AppConfig, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();

    // RUST_LOG or LOG_LEVEL override the default filter
    let _telemetry_guard = init_telemetry(TelemetryConfig::for_app("workflows-stress", "info"));
    if let Some(path) = dotenv {
        tracing::info!("Loaded .env from {:?}", path);
    }

    // No HTTP listener; only the backend and app id settings are used
    let config = AppConfig::from_env(0, "workflows-stress");
    let stress_config = StressConfig::from_env();

    let client = backend::workflow_client(&config, basic::registry())?;
    let counter = Arc::new(CompletionCounter::new());
    let shutdown = http::shutdown_token();

    stress::run(client, stress_config, counter.clone(), shutdown).await;

    tracing::info!(completed = counter.get(), "workflows-stress shutdown complete");
    Ok(())
}
