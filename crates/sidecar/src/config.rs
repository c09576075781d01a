//! Sidecar connection settings

use std::env;
use std::time::Duration;

const DEFAULT_HTTP_PORT: u16 = 3500;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the sidecar listens and how to talk to it
#[derive(Debug, Clone)]
pub struct SidecarConfig {
    /// Base URL, e.g. `http://127.0.0.1:3500`
    pub endpoint: String,

    /// Token sent in the `dapr-api-token` header
    pub api_token: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl SidecarConfig {
    /// Config for a sidecar at `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `DAPR_HTTP_ENDPOINT`: full base URL (takes precedence)
    /// - `DAPR_HTTP_PORT`: port on 127.0.0.1 (default: 3500)
    /// - `DAPR_API_TOKEN`: API token
    /// - `DAPR_HTTP_TIMEOUT_SECS`: request timeout (default: 60)
    pub fn from_env() -> Self {
        let endpoint = env::var("DAPR_HTTP_ENDPOINT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| {
                let port = env::var("DAPR_HTTP_PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .unwrap_or(DEFAULT_HTTP_PORT);
                format!("http://127.0.0.1:{port}")
            });

        let api_token = env::var("DAPR_API_TOKEN")
            .ok()
            .filter(|v| !v.is_empty());

        let timeout = env::var("DAPR_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Self {
            api_token,
            timeout,
            ..Self::new(endpoint)
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self::new(format!("http://127.0.0.1:{DEFAULT_HTTP_PORT}"))
    }
}
