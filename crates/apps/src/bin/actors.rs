use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use testapps::actors::{self, ActorCallCounts, ActorsState};
use testapps::{backend, config, http, init_telemetry, AppConfig, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();

    // RUST_LOG or LOG_LEVEL override the default filter
    let _telemetry_guard = init_telemetry(TelemetryConfig::for_app("actors", "info"));
    if let Some(path) = dotenv {
        tracing::info!("Loaded .env from {:?}", path);
    }

    tracing::info!("actors app starting...");

    let config = AppConfig::from_env(6010, "actors");
    let sidecar = backend::sidecar_client()?;
    let counts = Arc::new(ActorCallCounts::new());
    let state = ActorsState::new(sidecar, counts.clone());
    let shutdown = http::shutdown_token();

    let reporter = tokio::spawn(actors::report_stats(
        counts,
        state.num_actors,
        Duration::from_secs(1),
        shutdown.clone(),
    ));

    let served = http::serve(actors::app(state), config.port, shutdown.clone()).await;
    shutdown.cancel();
    reporter.await.context("Stats reporter failed")?;
    served?;

    tracing::info!("actors app shutdown complete");
    Ok(())
}
