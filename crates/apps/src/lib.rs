//! # Sidecar test applications
//!
//! Small HTTP services that exercise a distributed-application sidecar:
//! actors with reminders and timers, pub/sub, bindings and durable
//! workflows. Each binary under `src/bin` wires one of the modules below to
//! the shared plumbing in [`http`], [`config`] and [`telemetry`].

pub mod actors;
pub mod backend;
pub mod bindings;
pub mod config;
pub mod http;
pub mod pubsub;
pub mod stress;
pub mod telemetry;
pub mod workflows;

pub use config::{AppConfig, WorkflowBackend};
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
