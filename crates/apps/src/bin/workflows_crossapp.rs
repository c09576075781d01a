use anyhow::Result;
use testapps::workflows::{self, crossapp};
use testapps::{config, http, init_telemetry, AppConfig, TelemetryConfig};
use testapps_durable::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();

    // RUST_LOG or LOG_LEVEL override the default filter
    let _telemetry_guard = init_telemetry(TelemetryConfig::for_app("workflows-crossapp", "info"));
    if let Some(path) = dotenv {
        tracing::info!("Loaded .env from {:?}", path);
    }

    tracing::info!("workflows-crossapp app starting...");

    let config = AppConfig::from_env(6009, "workflows-crossapp");
    tracing::info!(
        target_app_id = crossapp::TARGET_APP_ID,
        retry = ?crossapp::activity_retry_policy(),
        "Cross-app activity target"
    );
    let shutdown = http::shutdown_token();

    workflows::serve_app(
        &config,
        crossapp::TestWorkflow2::TYPE,
        crossapp::registry(),
        shutdown,
    )
    .await?;

    tracing::info!("workflows-crossapp app shutdown complete");
    Ok(())
}
