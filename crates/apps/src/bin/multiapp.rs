use anyhow::Result;
use testapps::workflows::{self, multiapp};
use testapps::{config, http, init_telemetry, AppConfig, TelemetryConfig};
use testapps_durable::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();

    // RUST_LOG or LOG_LEVEL override the default filter
    let _telemetry_guard = init_telemetry(TelemetryConfig::for_app("multiapp", "info"));
    if let Some(path) = dotenv {
        tracing::info!("Loaded .env from {:?}", path);
    }

    tracing::info!("multiapp app starting...");

    let config = AppConfig::from_env(6006, "multiapp");
    let shutdown = http::shutdown_token();

    workflows::serve_app(
        &config,
        multiapp::TestWorkflow::TYPE,
        multiapp::registry(),
        shutdown,
    )
    .await?;

    tracing::info!("multiapp app shutdown complete");
    Ok(())
}
