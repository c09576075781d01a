use anyhow::Result;
use testapps::workflows::{self, basic};
use testapps::{config, http, init_telemetry, AppConfig, TelemetryConfig};
use testapps_durable::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();

    // RUST_LOG or LOG_LEVEL override the default filter
    let _telemetry_guard = init_telemetry(TelemetryConfig::for_app("workflows", "info"));
    if let Some(path) = dotenv {
        tracing::info!("Loaded .env from {:?}", path);
    }

    tracing::info!("workflows app starting...");

    let config = AppConfig::from_env(6006, "workflows");
    let shutdown = http::shutdown_token();

    workflows::serve_app(
        &config,
        basic::TestWorkflow::TYPE,
        basic::registry(),
        shutdown,
    )
    .await?;

    tracing::info!("workflows app shutdown complete");
    Ok(())
}
