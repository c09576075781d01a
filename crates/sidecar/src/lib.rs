//! # Sidecar client
//!
//! Typed client for the sidecar's HTTP API (`/v1.0/...`), used by the test
//! apps to register actor reminders, publish events, invoke bindings and
//! drive workflows through the sidecar.
//!
//! ```ignore
//! use testapps_sidecar::{SidecarClient, SidecarConfig, ReminderRequest};
//!
//! let client = SidecarClient::new(SidecarConfig::from_env())?;
//! client
//!     .register_actor_reminder(
//!         "testActorType",
//!         "my-actor-id-0",
//!         "my-reminder-0",
//!         &ReminderRequest::new("1s", "1s"),
//!     )
//!     .await?;
//! ```

mod actors;
mod bindings;
mod client;
mod config;
mod error;
mod health;
mod pubsub;
mod workflows;

pub use actors::{ActorRuntimeConfig, ReminderRequest, TimerRequest};
pub use bindings::BindingRequest;
pub use client::SidecarClient;
pub use config::SidecarConfig;
pub use error::SidecarError;
pub use pubsub::{CloudEvent, Subscription, TopicEventResponse, TopicEventStatus};
pub use workflows::SidecarWorkflowClient;

/// Header carrying the sidecar API token
pub const API_TOKEN_HEADER: &str = "dapr-api-token";
