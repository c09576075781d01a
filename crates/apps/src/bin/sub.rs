use anyhow::Result;
use testapps::{config, http, init_telemetry, pubsub, AppConfig, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();

    let _telemetry_guard = init_telemetry(TelemetryConfig::for_app("sub", "info"));
    if let Some(path) = dotenv {
        tracing::info!("Loaded .env from {:?}", path);
    }

    let config = AppConfig::from_env(6005, "sub");
    tracing::info!(
        port = config.port,
        pubsub = pubsub::PUBSUB_NAME,
        topic = pubsub::TOPIC,
        "Starting subscriber"
    );

    http::serve(pubsub::subscriber_app(), config.port, http::shutdown_token()).await
}
