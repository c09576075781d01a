//! # Durable workflows
//!
//! Workflow authoring model and an in-process engine for the test apps.
//!
//! ## Features
//!
//! - **State-machine workflows**: workflows react to activity and child workflow
//!   completions by returning [`WorkflowAction`]s
//! - **Retries**: per-activity [`RetryPolicy`] with exponential backoff
//! - **Child workflows and continue-as-new**, optionally addressed to another app id
//! - **Parallel activities**: everything scheduled in one step runs concurrently
//! - **[`WorkflowClient`]**: the schedule / wait / fetch surface the apps talk to,
//!   implemented here by [`WorkflowEngine`] and by the sidecar client crate
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowEngine                          │
//! │  (one driver task per instance, feeds completions back)     │
//! └─────────────────────────────────────────────────────────────┘
//!            │                                   │
//!            ▼                                   ▼
//! ┌──────────────────────────┐     ┌──────────────────────────────┐
//! │    WorkflowRegistry      │     │    InMemoryInstanceStore      │
//! │ (workflows + activities) │     │ (status, output, history)     │
//! └──────────────────────────┘     └──────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use testapps_durable::prelude::*;
//!
//! struct Doubler { n: i64 }
//!
//! impl Workflow for Doubler {
//!     const TYPE: &'static str = "Doubler";
//!     type Input = i64;
//!
//!     fn new(n: i64) -> Self { Self { n } }
//!
//!     fn on_start(&mut self, _ctx: &WorkflowContext) -> Vec<WorkflowAction> {
//!         vec![WorkflowAction::schedule_activity("double", "DoubleActivity", json!(self.n))]
//!     }
//!
//!     fn on_activity_completed(&mut self, _ctx: &WorkflowContext, _id: &str, result: Value)
//!         -> Vec<WorkflowAction> {
//!         vec![WorkflowAction::complete(result)]
//!     }
//! }
//! ```

pub mod activity;
pub mod client;
pub mod engine;
pub mod persistence;
pub mod reliability;
pub mod workflow;

/// Prelude for common imports
pub mod prelude {
    pub use crate::activity::{Activity, ActivityContext, ActivityError};
    pub use crate::client::{
        ClientError, FailureDetails, ScheduleOptions, WorkflowClient, WorkflowMetadata,
    };
    pub use crate::engine::{EngineConfig, WorkflowEngine, WorkflowRegistry};
    pub use crate::persistence::{InMemoryInstanceStore, RuntimeStatus};
    pub use crate::reliability::RetryPolicy;
    pub use crate::workflow::{
        ActivityOptions, Workflow, WorkflowAction, WorkflowContext, WorkflowError, WorkflowEvent,
    };
    pub use serde_json::{json, Value};
}

// Re-export key types at crate root
pub use activity::{Activity, ActivityContext, ActivityError};
pub use client::{ClientError, FailureDetails, ScheduleOptions, WorkflowClient, WorkflowMetadata};
pub use engine::{EngineConfig, RegistryError, WorkflowEngine, WorkflowRegistry};
pub use persistence::{InMemoryInstanceStore, RuntimeStatus, StoreError};
pub use reliability::RetryPolicy;
pub use workflow::{
    ActivityOptions, Workflow, WorkflowAction, WorkflowContext, WorkflowError, WorkflowEvent,
};
