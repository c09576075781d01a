//! Output and input binding app
//!
//! Two listeners: the web app triggers the `testbinding` output binding,
//! the bindings app receives the same binding as input.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use testapps_sidecar::SidecarClient;
use tracing::{error, info};

use crate::http;

pub const BINDING_NAME: &str = "testbinding";
pub const OPERATION: &str = "create";
pub const MESSAGE: &str = "HELLO";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StartResponse {
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn start(State(sidecar): State<SidecarClient>) -> (StatusCode, Json<StartResponse>) {
    info!(binding = BINDING_NAME, message = MESSAGE, "Sending message");

    match sidecar
        .invoke_binding(BINDING_NAME, OPERATION, Value::from(MESSAGE), HashMap::new())
        .await
    {
        Ok(body) => {
            info!(response = %String::from_utf8_lossy(&body), "Binding response");
            (
                StatusCode::OK,
                Json(StartResponse {
                    status: "OK".to_string(),
                    error: None,
                }),
            )
        }
        Err(e) => {
            error!(error = %e, "Error invoking binding");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StartResponse {
                    status: "failed".to_string(),
                    error: Some(format!("Failed to invoke binding: {e}")),
                }),
            )
        }
    }
}

/// Router of the web listener
pub fn web_app(sidecar: SidecarClient) -> Router {
    Router::new()
        .merge(http::health_routes())
        .merge(
            Router::new()
                .route("/start", post(start))
                .with_state(sidecar),
        )
        .fallback(http::not_found)
}

async fn receive(body: Bytes) -> StatusCode {
    info!(message = %String::from_utf8_lossy(&body), "Received message");
    StatusCode::OK
}

/// The sidecar probes input binding routes with OPTIONS at startup
async fn acknowledge() -> StatusCode {
    StatusCode::OK
}

/// Router of the input binding listener
pub fn binding_app() -> Router {
    Router::new()
        .route(
            &format!("/{BINDING_NAME}"),
            post(receive).options(acknowledge),
        )
        .fallback(http::not_found)
}
