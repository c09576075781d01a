//! Publishing events and the types of the subscription callback protocol

use reqwest::{header::CONTENT_TYPE, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{SidecarClient, SidecarError};

/// One entry of the app's `GET /dapr/subscribe` response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "pubsubname")]
    pub pubsub_name: String,
    pub topic: String,

    /// App route the sidecar delivers events to
    pub route: String,
}

impl Subscription {
    pub fn new(
        pubsub_name: impl Into<String>,
        topic: impl Into<String>,
        route: impl Into<String>,
    ) -> Self {
        Self {
            pubsub_name: pubsub_name.into(),
            topic: topic.into(),
            route: route.into(),
        }
    }
}

/// CloudEvents envelope the sidecar delivers to subscribers
///
/// Only the fields the apps read are typed; everything else is kept in
/// `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudEvent {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub source: String,

    #[serde(default, rename = "type")]
    pub event_type: String,

    #[serde(default, rename = "datacontenttype")]
    pub data_content_type: Option<String>,

    #[serde(default)]
    pub topic: Option<String>,

    #[serde(default, rename = "pubsubname")]
    pub pubsub_name: Option<String>,

    /// JSON payload (or a string for non-JSON content)
    #[serde(default)]
    pub data: Value,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl CloudEvent {
    /// Payload as JSON, parsing string payloads that carry a JSON document
    pub fn json_data(&self) -> Result<Value, serde_json::Error> {
        match &self.data {
            Value::String(raw) => serde_json::from_str(raw),
            other => Ok(other.clone()),
        }
    }
}

/// Delivery outcome reported back to the sidecar
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicEventStatus {
    Success,
    Retry,
    Drop,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicEventResponse {
    pub status: TopicEventStatus,
}

impl TopicEventResponse {
    pub fn success() -> Self {
        Self {
            status: TopicEventStatus::Success,
        }
    }

    pub fn retry() -> Self {
        Self {
            status: TopicEventStatus::Retry,
        }
    }

    pub fn drop_event() -> Self {
        Self {
            status: TopicEventStatus::Drop,
        }
    }
}

impl SidecarClient {
    /// Publish `data` to `topic` on the `pubsub` component
    ///
    /// `content_type` defaults to `application/json`.
    pub async fn publish_event(
        &self,
        pubsub: &str,
        topic: &str,
        data: &Value,
        content_type: Option<&str>,
    ) -> Result<(), SidecarError> {
        let content_type = content_type.unwrap_or("application/json");
        debug!(pubsub, topic, content_type, "publishing event");

        let body = match data {
            Value::String(raw) if content_type != "application/json" => raw.clone().into_bytes(),
            other => serde_json::to_vec(other)?,
        };

        let request = self
            .request(Method::POST, &format!("/v1.0/publish/{pubsub}/{topic}"))
            .header(CONTENT_TYPE, content_type)
            .body(body);
        self.send(request).await.map(drop)
    }
}
