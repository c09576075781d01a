//! Workflow backend selection

use std::sync::Arc;

use anyhow::{Context, Result};
use testapps_durable::{EngineConfig, WorkflowClient, WorkflowEngine, WorkflowRegistry};
use testapps_sidecar::{SidecarClient, SidecarConfig, SidecarWorkflowClient};
use tracing::info;

use crate::config::{AppConfig, WorkflowBackend};

/// Build the workflow client for the configured backend
///
/// `local` runs the registry on an in-process engine owned by this app.
/// `sidecar` schedules through the sidecar's workflow API; the registry is
/// then only used for logging, since the definitions run in the sidecar's
/// workers.
pub fn workflow_client(
    config: &AppConfig,
    registry: WorkflowRegistry,
) -> Result<Arc<dyn WorkflowClient>> {
    match config.workflow_backend {
        WorkflowBackend::Local => {
            let engine = WorkflowEngine::new(EngineConfig::new(config.app_id.clone()), registry);
            info!(app_id = %config.app_id, "Using in-process workflow engine");
            Ok(Arc::new(engine))
        }
        WorkflowBackend::Sidecar => {
            let sidecar_config = SidecarConfig::from_env();
            info!(
                endpoint = %sidecar_config.endpoint,
                workflows = ?registry.workflow_types().collect::<Vec<_>>(),
                "Using sidecar workflow API"
            );
            let client =
                SidecarClient::new(sidecar_config).context("Failed to create sidecar client")?;
            Ok(Arc::new(SidecarWorkflowClient::new(client)))
        }
    }
}

/// Sidecar client for the non-workflow building blocks
pub fn sidecar_client() -> Result<SidecarClient> {
    let config = SidecarConfig::from_env();
    info!(endpoint = %config.endpoint, "Sidecar client configured");
    SidecarClient::new(config).context("Failed to create sidecar client")
}
