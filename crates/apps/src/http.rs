//! HTTP plumbing shared by the apps
//!
//! - `GET /healthz` liveness probe
//! - `POST /start` schedules a workflow and waits for it to finish
//! - a logged 404 fallback
//! - [`serve`] with graceful shutdown on Ctrl-C / SIGTERM

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use testapps_durable::{ClientError, RuntimeStatus, ScheduleOptions, WorkflowClient};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Current time the way the apps print it (RFC 3339, second precision)
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: timestamp_now(),
    })
}

pub fn health_routes() -> Router {
    Router::new().route("/healthz", get(health))
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    info!(uri = %uri, "Not found");
    (StatusCode::NOT_FOUND, "Not Found")
}

// ============================================================================
// Workflow start
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub input: Option<String>,
}

/// Result of `POST /start`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkflowResponse {
    pub status: String,

    #[serde(default)]
    pub instance_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowResponse {
    fn completed(instance_id: String, result: Option<String>) -> Self {
        Self {
            status: "completed".to_string(),
            instance_id,
            result,
            message: None,
            error: None,
        }
    }

    fn failed(instance_id: String, error: String) -> Self {
        Self {
            status: "failed".to_string(),
            instance_id,
            result: None,
            message: None,
            error: Some(error),
        }
    }

    fn timeout(instance_id: String) -> Self {
        Self {
            status: "timeout".to_string(),
            instance_id,
            result: None,
            message: Some("Workflow execution timed out".to_string()),
            error: None,
        }
    }
}

/// State of the `/start` route: which workflow to run and where
#[derive(Clone)]
pub struct WorkflowState {
    pub client: Arc<dyn WorkflowClient>,
    pub workflow_name: String,
    pub timeout: Duration,
}

impl WorkflowState {
    pub fn new(
        client: Arc<dyn WorkflowClient>,
        workflow_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            workflow_name: workflow_name.into(),
            timeout,
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/json"))
        .unwrap_or(false)
}

/// Workflow input from the request, defaulting to the current timestamp
fn workflow_input(headers: &HeaderMap, body: &[u8]) -> String {
    let request = if is_json(headers) {
        serde_json::from_slice::<StartRequest>(body).unwrap_or_else(|e| {
            warn!(error = %e, "Error parsing request body");
            StartRequest::default()
        })
    } else {
        StartRequest::default()
    };

    request
        .input
        .filter(|input| !input.is_empty())
        .unwrap_or_else(timestamp_now)
}

async fn start_workflow(
    State(state): State<WorkflowState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WorkflowResponse>) {
    let input = workflow_input(&headers, &body);
    info!(workflow = %state.workflow_name, input = %input, "Starting workflow");

    let options = ScheduleOptions {
        instance_id: None,
        input: Some(serde_json::Value::String(input)),
    };
    let instance_id = match state
        .client
        .schedule_new_workflow(&state.workflow_name, options)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "Error starting workflow");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WorkflowResponse::failed(
                    String::new(),
                    format!("Failed to start workflow: {e}"),
                )),
            );
        }
    };
    info!(instance_id = %instance_id, "Workflow started");

    let metadata = match state
        .client
        .wait_for_workflow_completion(&instance_id, state.timeout)
        .await
    {
        Ok(metadata) => metadata,
        Err(ClientError::Timeout(_)) => {
            error!(instance_id = %instance_id, "Workflow timed out");
            return (
                StatusCode::REQUEST_TIMEOUT,
                Json(WorkflowResponse::timeout(instance_id)),
            );
        }
        Err(e) => {
            error!(instance_id = %instance_id, error = %e, "Error waiting for workflow completion");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WorkflowResponse::failed(
                    instance_id,
                    format!("Failed to wait for workflow completion: {e}"),
                )),
            );
        }
    };

    if metadata.runtime_status != RuntimeStatus::Completed {
        let reason = metadata
            .failure_details
            .as_ref()
            .map(|details| details.message.as_str())
            .unwrap_or_default();
        let message = format!(
            "Workflow failed with status: {}. Error: {}",
            metadata.runtime_status, reason
        );
        error!(instance_id = %instance_id, "{message}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(WorkflowResponse::failed(instance_id, message)),
        );
    }

    info!(
        instance_id = %instance_id,
        result = metadata.serialized_output.as_deref().unwrap_or_default(),
        "Workflow completed"
    );
    (
        StatusCode::OK,
        Json(WorkflowResponse::completed(
            instance_id,
            metadata.serialized_output,
        )),
    )
}

pub fn start_routes(state: WorkflowState) -> Router {
    Router::new()
        .route("/start", post(start_workflow))
        .with_state(state)
}

/// Complete router of a workflow app
pub fn workflow_app(state: WorkflowState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(start_routes(state))
        .fallback(not_found)
}

// ============================================================================
// Serving
// ============================================================================

/// Token cancelled on Ctrl-C or SIGTERM
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        cancel.cancel();
    });
    token
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Serve `app` on all interfaces until `shutdown` is cancelled
pub async fn serve(app: Router, port: u16, shutdown: CancellationToken) -> Result<()> {
    let app = app.layer(TraceLayer::new_for_http());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!(address = %addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("Server error")?;

    info!(address = %addr, "HTTP server stopped");
    Ok(())
}
