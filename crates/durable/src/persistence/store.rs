//! Instance store types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowError;

/// Error type for store operations
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// Instance not found
    #[error("workflow instance not found: {0}")]
    InstanceNotFound(String),

    /// An instance with this id already exists
    #[error("workflow instance already exists: {0}")]
    InstanceExists(String),

    /// The instance already reached a terminal status
    #[error("workflow instance {0} is already {1}")]
    InstanceTerminal(String, RuntimeStatus),

    /// The instance has not reached a terminal status yet
    #[error("workflow instance {0} is still {1}")]
    InstanceNotTerminal(String, RuntimeStatus),
}

/// Runtime status of a workflow instance
///
/// Serialized with the sidecar's names (`RUNNING`, `COMPLETED`, ...) so that
/// the in-process engine and the sidecar client report statuses alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeStatus {
    /// Instance is running
    Running,

    /// Instance completed successfully
    Completed,

    /// Instance restarted itself with new input
    ContinuedAsNew,

    /// Instance failed
    Failed,

    /// Instance was canceled
    Canceled,

    /// Instance was terminated from outside
    Terminated,

    /// Instance created but not started
    Pending,

    /// Instance is suspended
    Suspended,
}

impl RuntimeStatus {
    /// Whether the instance will make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Canceled | Self::Terminated
        )
    }

    /// Parse a status name as reported by the sidecar
    ///
    /// Accepts both `COMPLETED` and `ORCHESTRATION_STATUS_COMPLETED`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = name.strip_prefix("ORCHESTRATION_STATUS_").unwrap_or(name);
        match name.to_ascii_uppercase().as_str() {
            "RUNNING" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "CONTINUED_AS_NEW" => Some(Self::ContinuedAsNew),
            "FAILED" => Some(Self::Failed),
            "CANCELED" | "CANCELLED" => Some(Self::Canceled),
            "TERMINATED" => Some(Self::Terminated),
            "PENDING" => Some(Self::Pending),
            "SUSPENDED" => Some(Self::Suspended),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::ContinuedAsNew => "CONTINUED_AS_NEW",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
            Self::Terminated => "TERMINATED",
            Self::Pending => "PENDING",
            Self::Suspended => "SUSPENDED",
        }
    }
}

impl std::fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a workflow instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceRecord {
    pub instance_id: String,
    pub name: String,
    pub status: RuntimeStatus,
    pub input: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub failure: Option<WorkflowError>,
    pub parent_instance_id: Option<String>,
    pub generation: u32,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}
