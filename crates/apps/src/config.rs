//! App configuration from environment variables

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Load `.env` from the working directory or its parents, if present
///
/// Call before reading any other configuration.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Where workflows are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowBackend {
    /// In-process engine
    #[default]
    Local,
    /// The sidecar's workflow API
    Sidecar,
}

impl WorkflowBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "sidecar" | "dapr" => Some(Self::Sidecar),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Sidecar => write!(f, "sidecar"),
        }
    }
}

/// Settings shared by every app binary
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the HTTP server listens on
    pub port: u16,

    /// This app's id, used as the owning app of local workflows
    pub app_id: String,

    pub workflow_backend: WorkflowBackend,

    /// Bound on waiting for a workflow to finish
    pub workflow_timeout: Duration,
}

impl AppConfig {
    pub const DEFAULT_WORKFLOW_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `APP_PORT`: listen port (default: `default_port`)
    /// - `APP_ID`: app id (default: `default_app_id`)
    /// - `WORKFLOW_BACKEND`: `local` or `sidecar` (default: `local`)
    /// - `WORKFLOW_TIMEOUT_SECS`: completion wait bound (default: 30)
    pub fn from_env(default_port: u16, default_app_id: &str) -> Self {
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default_port);

        let app_id = std::env::var("APP_ID").unwrap_or_else(|_| default_app_id.to_string());

        let workflow_backend = match std::env::var("WORKFLOW_BACKEND") {
            Ok(value) => WorkflowBackend::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown WORKFLOW_BACKEND, using local");
                WorkflowBackend::Local
            }),
            Err(_) => WorkflowBackend::default(),
        };

        let workflow_timeout = std::env::var("WORKFLOW_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Self::DEFAULT_WORKFLOW_TIMEOUT);

        Self {
            port,
            app_id,
            workflow_backend,
            workflow_timeout,
        }
    }

    pub fn new(port: u16, app_id: impl Into<String>) -> Self {
        Self {
            port,
            app_id: app_id.into(),
            workflow_backend: WorkflowBackend::default(),
            workflow_timeout: Self::DEFAULT_WORKFLOW_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!(WorkflowBackend::parse("local"), Some(WorkflowBackend::Local));
        assert_eq!(WorkflowBackend::parse(" Sidecar "), Some(WorkflowBackend::Sidecar));
        assert_eq!(WorkflowBackend::parse("dapr"), Some(WorkflowBackend::Sidecar));
        assert_eq!(WorkflowBackend::parse("grpc"), None);
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = AppConfig::new(6006, "workflows");
        assert_eq!(config.port, 6006);
        assert_eq!(config.app_id, "workflows");
        assert_eq!(config.workflow_backend, WorkflowBackend::Local);
        assert_eq!(config.workflow_timeout, Duration::from_secs(30));
    }
}
