//! Sidecar lifecycle: shutdown and outbound health

use std::time::Duration;

use reqwest::{Method, StatusCode};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{SidecarClient, SidecarError};

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl SidecarClient {
    /// Ask the sidecar to shut down
    pub async fn shutdown(&self) -> Result<(), SidecarError> {
        info!(endpoint = %self.config().endpoint, "requesting sidecar shutdown");
        let request = self.request(Method::POST, "/v1.0/shutdown");
        self.send(request).await.map(drop)
    }

    /// Wait until the sidecar reports its outbound components ready
    ///
    /// Polls `GET /v1.0/healthz/outbound` until it answers 204 or `timeout`
    /// elapses.
    pub async fn wait_for_outbound_health(&self, timeout: Duration) -> Result<(), SidecarError> {
        let deadline = Instant::now() + timeout;

        loop {
            let request = self.request(Method::GET, "/v1.0/healthz/outbound");
            match request.send().await {
                Ok(response) if response.status() == StatusCode::NO_CONTENT => {
                    debug!("sidecar outbound healthy");
                    return Ok(());
                }
                Ok(response) => debug!(status = %response.status(), "sidecar not ready"),
                Err(e) => debug!(error = %e, "sidecar unreachable"),
            }

            if Instant::now() + HEALTH_POLL_INTERVAL > deadline {
                return Err(SidecarError::Timeout(
                    timeout,
                    "sidecar outbound health".to_string(),
                ));
            }
            tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
        }
    }
}
