use anyhow::Result;
use testapps::{backend, bindings, config, http, init_telemetry, AppConfig, TelemetryConfig};

const DEFAULT_WEB_PORT: u16 = 6005;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();

    let _telemetry_guard = init_telemetry(TelemetryConfig::for_app("bindings", "debug"));
    if let Some(path) = dotenv {
        tracing::info!("Loaded .env from {:?}", path);
    }

    // APP_PORT is the input binding listener the sidecar calls
    let config = AppConfig::from_env(50051, "bindings");
    let web_port = std::env::var("WEB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_WEB_PORT);

    let sidecar = backend::sidecar_client()?;
    let shutdown = http::shutdown_token();

    tracing::info!(port = config.port, "Running bindings app");
    tracing::info!(port = web_port, "Running web app");

    tokio::try_join!(
        http::serve(bindings::binding_app(), config.port, shutdown.clone()),
        http::serve(bindings::web_app(sidecar), web_port, shutdown),
    )?;

    tracing::info!("bindings shutdown complete");
    Ok(())
}
