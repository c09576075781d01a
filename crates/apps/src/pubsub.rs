//! Pub/sub publisher loop and subscriber routes

use std::time::Duration;

use axum::{body::Bytes, routing::get, routing::post, Json, Router};
use serde_json::json;
use testapps_sidecar::{CloudEvent, SidecarClient, SidecarError, Subscription, TopicEventResponse};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::http;

pub const PUBSUB_NAME: &str = "pubsub";
pub const TOPIC: &str = "numbers";
pub const ROUTE: &str = "/numbers";

// =============================================================================
// Publisher
// =============================================================================

/// Publish `{"number": i}` for i = 1, 2, ... once per `interval`
///
/// Returns the number of events published when `shutdown` is cancelled,
/// or the first publish error.
pub async fn publish_numbers(
    sidecar: &SidecarClient,
    interval: Duration,
    shutdown: CancellationToken,
) -> Result<u64, SidecarError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    let mut i: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(published = i, "Publisher stopped");
                return Ok(i);
            }
            _ = ticker.tick() => {
                i += 1;
                sidecar
                    .publish_event(PUBSUB_NAME, TOPIC, &json!({ "number": i }), None)
                    .await?;
                info!(number = i, "Published event");
            }
        }
    }
}

// =============================================================================
// Subscriber
// =============================================================================

async fn subscriptions() -> Json<Vec<Subscription>> {
    Json(vec![Subscription::new(PUBSUB_NAME, TOPIC, ROUTE)])
}

/// Log the event payload; ask for redelivery when it is not JSON
async fn numbers(body: Bytes) -> Json<TopicEventResponse> {
    let data = serde_json::from_slice::<CloudEvent>(&body)
        .and_then(|event| event.json_data());

    match data {
        Ok(data) => {
            info!(data = %data, "Subscriber received");
            Json(TopicEventResponse::success())
        }
        Err(e) => {
            error!(error = %e, "Error processing message");
            Json(TopicEventResponse::retry())
        }
    }
}

pub fn subscriber_routes() -> Router {
    Router::new()
        .route("/dapr/subscribe", get(subscriptions))
        .route(ROUTE, post(numbers))
}

/// Complete router of the subscriber app
pub fn subscriber_app() -> Router {
    Router::new()
        .merge(http::health_routes())
        .merge(subscriber_routes())
        .fallback(http::not_found)
}
