//! Workflow client abstraction
//!
//! [`WorkflowClient`] is the surface the apps use to start and observe
//! workflow instances. The in-process [`WorkflowEngine`](crate::WorkflowEngine)
//! implements it, and so does the sidecar HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::engine::RegistryError;
use crate::persistence::{RuntimeStatus, StoreError};
use crate::workflow::WorkflowError;

/// Options for scheduling a new workflow instance
#[derive(Debug, Clone, Default)]
pub struct ScheduleOptions {
    /// Instance id to use (a UUID v7 is generated when absent)
    pub instance_id: Option<String>,

    /// Workflow input
    pub input: Option<Value>,
}

impl ScheduleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// Set the input, serializing it to JSON
    pub fn with_input<T: Serialize>(mut self, input: &T) -> Result<Self, ClientError> {
        self.input = Some(serde_json::to_value(input)?);
        Ok(self)
    }
}

/// Why an instance failed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetails {
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub stack_trace: Option<String>,
}

impl From<&WorkflowError> for FailureDetails {
    fn from(error: &WorkflowError) -> Self {
        Self {
            error_type: error.code.clone(),
            message: error.message.clone(),
            stack_trace: None,
        }
    }
}

/// Snapshot of a workflow instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowMetadata {
    pub instance_id: String,
    pub name: String,
    pub runtime_status: RuntimeStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,

    /// Input as a JSON document
    pub serialized_input: Option<String>,

    /// Output as a JSON document
    pub serialized_output: Option<String>,

    pub failure_details: Option<FailureDetails>,
}

impl WorkflowMetadata {
    /// Whether the instance reached a terminal status
    pub fn is_complete(&self) -> bool {
        self.runtime_status.is_terminal()
    }

    /// Deserialize the output, if any
    pub fn output<T: DeserializeOwned>(&self) -> Result<Option<T>, ClientError> {
        self.serialized_output
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(ClientError::from)
    }
}

/// Errors from workflow client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Instance not found
    #[error("workflow instance not found: {0}")]
    NotFound(String),

    /// Instance id already in use
    #[error("workflow instance already exists: {0}")]
    AlreadyExists(String),

    /// Instance is in a status that does not allow the operation
    #[error("workflow instance {0} is {1}")]
    InvalidStatus(String, RuntimeStatus),

    /// Unknown workflow name or bad input
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Waiting for completion exceeded the deadline
    #[error("timed out waiting for workflow instance {0}")]
    Timeout(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error reported by a remote backend
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InstanceNotFound(id) => Self::NotFound(id),
            StoreError::InstanceExists(id) => Self::AlreadyExists(id),
            StoreError::InstanceTerminal(id, status)
            | StoreError::InstanceNotTerminal(id, status) => Self::InvalidStatus(id, status),
        }
    }
}

/// Schedule, observe and stop workflow instances
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    /// Start a new instance of the named workflow, returning its instance id
    async fn schedule_new_workflow(
        &self,
        name: &str,
        options: ScheduleOptions,
    ) -> Result<String, ClientError>;

    /// Get the current state of an instance
    async fn fetch_workflow_metadata(
        &self,
        instance_id: &str,
    ) -> Result<WorkflowMetadata, ClientError>;

    /// Wait until the instance reaches a terminal status
    ///
    /// Returns [`ClientError::Timeout`] when `timeout` elapses first.
    async fn wait_for_workflow_completion(
        &self,
        instance_id: &str,
        timeout: Duration,
    ) -> Result<WorkflowMetadata, ClientError>;

    /// Stop a running instance
    async fn terminate_workflow(
        &self,
        instance_id: &str,
        output: Option<Value>,
    ) -> Result<(), ClientError>;

    /// Remove a terminal instance
    async fn purge_workflow(&self, instance_id: &str) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(output: Option<&str>) -> WorkflowMetadata {
        WorkflowMetadata {
            instance_id: "wf-1".into(),
            name: "TestWorkflow".into(),
            runtime_status: RuntimeStatus::Completed,
            created_at: Utc::now(),
            last_updated_at: Utc::now(),
            serialized_input: Some("\"in\"".into()),
            serialized_output: output.map(str::to_string),
            failure_details: None,
        }
    }

    #[test]
    fn test_output_deserializes() {
        let meta = metadata(Some("\"done\""));
        assert!(meta.is_complete());
        assert_eq!(meta.output::<String>().unwrap().as_deref(), Some("done"));
    }

    #[test]
    fn test_missing_output_is_none() {
        assert_eq!(metadata(None).output::<String>().unwrap(), None);
    }

    #[test]
    fn test_store_error_conversion() {
        let err = ClientError::from(StoreError::InstanceExists("wf-1".into()));
        assert!(matches!(err, ClientError::AlreadyExists(id) if id == "wf-1"));
    }

    #[test]
    fn test_failure_details_from_workflow_error() {
        let details = FailureDetails::from(&WorkflowError::new("boom").with_code("BOOM"));
        assert_eq!(details.message, "boom");
        assert_eq!(details.error_type.as_deref(), Some("BOOM"));
    }

    #[test]
    fn test_schedule_options() {
        let options = ScheduleOptions::new()
            .with_instance_id("abc")
            .with_input(&"hello")
            .unwrap();
        assert_eq!(options.instance_id.as_deref(), Some("abc"));
        assert_eq!(options.input, Some(Value::String("hello".into())));
    }
}
