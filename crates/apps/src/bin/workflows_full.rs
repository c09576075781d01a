use anyhow::Result;
use testapps::workflows::{self, full};
use testapps::{config, http, init_telemetry, AppConfig, TelemetryConfig};
use testapps_durable::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();

    // RUST_LOG or LOG_LEVEL override the default filter
    let _telemetry_guard = init_telemetry(TelemetryConfig::for_app("workflows-full", "info"));
    if let Some(path) = dotenv {
        tracing::info!("Loaded .env from {:?}", path);
    }

    tracing::info!("workflows-full app starting...");

    let config = AppConfig::from_env(6020, "workflows-full");
    tracing::info!(remote_app_id = full::REMOTE_APP_ID, "Cross-app children target");
    let shutdown = http::shutdown_token();

    workflows::serve_app(
        &config,
        full::RootWorkflow::TYPE,
        full::registry(),
        shutdown,
    )
    .await?;

    tracing::info!("workflows-full app shutdown complete");
    Ok(())
}
