//! Actor reminders, timers and the actor runtime config the app reports

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{SidecarClient, SidecarError};

/// Body of a reminder registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    /// Delay before the first invocation, e.g. `1s`
    pub due_time: String,

    /// Interval between invocations, e.g. `1s`
    pub period: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ReminderRequest {
    pub fn new(due_time: impl Into<String>, period: impl Into<String>) -> Self {
        Self {
            due_time: due_time.into(),
            period: period.into(),
            ttl: None,
            data: None,
        }
    }

    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Body of a timer registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerRequest {
    pub due_time: String,
    pub period: String,

    /// Actor method invoked when the timer fires
    pub callback: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl TimerRequest {
    pub fn new(
        due_time: impl Into<String>,
        period: impl Into<String>,
        callback: impl Into<String>,
    ) -> Self {
        Self {
            due_time: due_time.into(),
            period: period.into(),
            callback: callback.into(),
            data: None,
        }
    }
}

/// Response to `GET /dapr/config`: which actor types this app hosts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActorRuntimeConfig {
    pub entities: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_idle_timeout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain_ongoing_call_timeout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain_rebalanced_actors: Option<bool>,
}

impl ActorRuntimeConfig {
    pub fn new<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entities: entities.into_iter().map(Into::into).collect(),
            actor_idle_timeout: None,
            drain_ongoing_call_timeout: None,
            drain_rebalanced_actors: None,
        }
    }
}

fn actor_path(actor_type: &str, actor_id: &str, kind: &str, name: &str) -> String {
    format!("/v1.0/actors/{actor_type}/{actor_id}/{kind}/{name}")
}

impl SidecarClient {
    /// Register (or replace) a reminder on an actor
    pub async fn register_actor_reminder(
        &self,
        actor_type: &str,
        actor_id: &str,
        name: &str,
        reminder: &ReminderRequest,
    ) -> Result<(), SidecarError> {
        debug!(actor_type, actor_id, reminder = name, "registering reminder");
        let request = self
            .request(
                Method::POST,
                &actor_path(actor_type, actor_id, "reminders", name),
            )
            .json(reminder);
        self.send(request).await.map(drop)
    }

    pub async fn unregister_actor_reminder(
        &self,
        actor_type: &str,
        actor_id: &str,
        name: &str,
    ) -> Result<(), SidecarError> {
        debug!(actor_type, actor_id, reminder = name, "unregistering reminder");
        let request = self.request(
            Method::DELETE,
            &actor_path(actor_type, actor_id, "reminders", name),
        );
        self.send(request).await.map(drop)
    }

    /// Register a timer on an actor
    pub async fn register_actor_timer(
        &self,
        actor_type: &str,
        actor_id: &str,
        name: &str,
        timer: &TimerRequest,
    ) -> Result<(), SidecarError> {
        debug!(actor_type, actor_id, timer = name, "registering timer");
        let request = self
            .request(Method::POST, &actor_path(actor_type, actor_id, "timers", name))
            .json(timer);
        self.send(request).await.map(drop)
    }

    pub async fn unregister_actor_timer(
        &self,
        actor_type: &str,
        actor_id: &str,
        name: &str,
    ) -> Result<(), SidecarError> {
        debug!(actor_type, actor_id, timer = name, "unregistering timer");
        let request = self.request(
            Method::DELETE,
            &actor_path(actor_type, actor_id, "timers", name),
        );
        self.send(request).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reminder_serialization() {
        let reminder = ReminderRequest::new("1s", "1s");
        assert_eq!(
            serde_json::to_value(&reminder).unwrap(),
            json!({ "dueTime": "1s", "period": "1s" })
        );
    }

    #[test]
    fn test_timer_serialization() {
        let timer = TimerRequest::new("0s", "5s", "tick");
        assert_eq!(
            serde_json::to_value(&timer).unwrap(),
            json!({ "dueTime": "0s", "period": "5s", "callback": "tick" })
        );
    }

    #[test]
    fn test_runtime_config_lists_entities() {
        let config = ActorRuntimeConfig::new(["testActorType"]);
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({ "entities": ["testActorType"] })
        );
    }
}
