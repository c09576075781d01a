use std::time::Duration;

use anyhow::{Context, Result};
use testapps::{backend, config, http, init_telemetry, pubsub, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();

    let _telemetry_guard = init_telemetry(TelemetryConfig::for_app("pub", "info"));
    if let Some(path) = dotenv {
        tracing::info!("Loaded .env from {:?}", path);
    }

    let sidecar = backend::sidecar_client()?;
    let shutdown = http::shutdown_token();

    tracing::info!(
        pubsub = pubsub::PUBSUB_NAME,
        topic = pubsub::TOPIC,
        "Publishing numbers every second"
    );

    // A failed publish ends the app
    let published = pubsub::publish_numbers(&sidecar, Duration::from_secs(1), shutdown)
        .await
        .context("Failed to publish event")?;

    tracing::info!(published, "pub shutdown complete");
    Ok(())
}
