//! WorkflowClient over the sidecar's workflow HTTP API

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use testapps_durable::{
    ClientError, FailureDetails, RuntimeStatus, ScheduleOptions, WorkflowClient, WorkflowMetadata,
};
use tracing::{debug, warn};

use crate::{SidecarClient, SidecarError};

const WORKFLOW_COMPONENT: &str = "dapr";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const PROP_INPUT: &str = "dapr.workflow.input";
const PROP_OUTPUT: &str = "dapr.workflow.output";
const PROP_ERROR_TYPE: &str = "dapr.workflow.failure.error_type";
const PROP_ERROR_MESSAGE: &str = "dapr.workflow.failure.error_message";
const PROP_STACK_TRACE: &str = "dapr.workflow.failure.stack_trace";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    #[serde(rename = "instanceID")]
    instance_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(rename = "instanceID")]
    instance_id: String,
    #[serde(default)]
    workflow_name: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_updated_at: Option<DateTime<Utc>>,
    runtime_status: String,
    #[serde(default)]
    properties: HashMap<String, String>,
}

impl StatusResponse {
    fn into_metadata(mut self) -> Result<WorkflowMetadata, ClientError> {
        let runtime_status = RuntimeStatus::parse(&self.runtime_status).ok_or_else(|| {
            ClientError::Backend(format!("unknown runtime status: {}", self.runtime_status))
        })?;

        let failure_details = match (
            self.properties.remove(PROP_ERROR_TYPE),
            self.properties.remove(PROP_ERROR_MESSAGE),
        ) {
            (None, None) => None,
            (error_type, message) => Some(FailureDetails {
                error_type,
                message: message.unwrap_or_default(),
                stack_trace: self.properties.remove(PROP_STACK_TRACE),
            }),
        };

        Ok(WorkflowMetadata {
            instance_id: self.instance_id,
            name: self.workflow_name,
            runtime_status,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            last_updated_at: self.last_updated_at.unwrap_or_else(Utc::now),
            serialized_input: self.properties.remove(PROP_INPUT),
            serialized_output: self.properties.remove(PROP_OUTPUT),
            failure_details,
        })
    }
}

/// Schedules and observes workflows through the sidecar
///
/// Completion is observed by polling the status endpoint.
#[derive(Clone, Debug)]
pub struct SidecarWorkflowClient {
    client: SidecarClient,
    poll_interval: Duration,
}

impl SidecarWorkflowClient {
    pub fn new(client: SidecarClient) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn instance_path(instance_id: &str, action: Option<&str>) -> String {
        match action {
            Some(action) => {
                format!("/v1.0/workflows/{WORKFLOW_COMPONENT}/{instance_id}/{action}")
            }
            None => format!("/v1.0/workflows/{WORKFLOW_COMPONENT}/{instance_id}"),
        }
    }
}

fn client_error(instance_id: &str, err: SidecarError) -> ClientError {
    if err.is_not_found() {
        ClientError::NotFound(instance_id.to_string())
    } else {
        ClientError::Backend(err.to_string())
    }
}

#[async_trait]
impl WorkflowClient for SidecarWorkflowClient {
    async fn schedule_new_workflow(
        &self,
        name: &str,
        options: ScheduleOptions,
    ) -> Result<String, ClientError> {
        let mut request = self.client.request(
            Method::POST,
            &format!("/v1.0/workflows/{WORKFLOW_COMPONENT}/{name}/start"),
        );
        if let Some(instance_id) = &options.instance_id {
            request = request.query(&[("instanceID", instance_id)]);
        }
        if let Some(input) = &options.input {
            request = request.json(input);
        }

        let response: StartResponse = self
            .client
            .send_json(request)
            .await
            .map_err(|e| ClientError::Backend(e.to_string()))?;

        debug!(workflow = name, instance_id = %response.instance_id, "workflow scheduled on sidecar");
        Ok(response.instance_id)
    }

    async fn fetch_workflow_metadata(
        &self,
        instance_id: &str,
    ) -> Result<WorkflowMetadata, ClientError> {
        let request = self
            .client
            .request(Method::GET, &Self::instance_path(instance_id, None));
        let response: StatusResponse = self
            .client
            .send_json(request)
            .await
            .map_err(|e| client_error(instance_id, e))?;

        response.into_metadata()
    }

    async fn wait_for_workflow_completion(
        &self,
        instance_id: &str,
        timeout: Duration,
    ) -> Result<WorkflowMetadata, ClientError> {
        // The deadline covers in-flight status requests, not only the sleeps
        let poll = async {
            loop {
                let metadata = self.fetch_workflow_metadata(instance_id).await?;
                if metadata.is_complete() {
                    return Ok(metadata);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(instance_id.to_string())),
        }
    }

    async fn terminate_workflow(
        &self,
        instance_id: &str,
        output: Option<Value>,
    ) -> Result<(), ClientError> {
        if output.is_some() {
            warn!(instance_id, "sidecar terminate does not accept an output; ignoring it");
        }
        let request = self
            .client
            .request(Method::POST, &Self::instance_path(instance_id, Some("terminate")));
        self.client
            .send(request)
            .await
            .map(drop)
            .map_err(|e| client_error(instance_id, e))
    }

    async fn purge_workflow(&self, instance_id: &str) -> Result<(), ClientError> {
        let request = self
            .client
            .request(Method::POST, &Self::instance_path(instance_id, Some("purge")));
        self.client
            .send(request)
            .await
            .map(drop)
            .map_err(|e| client_error(instance_id, e))
    }
}
