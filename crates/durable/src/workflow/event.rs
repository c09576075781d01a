//! Workflow history events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WorkflowError;
use crate::activity::ActivityError;

/// Events recorded in an instance's history
///
/// History is append-only and kept for inspection; each continue-as-new
/// starts a new generation with a `WorkflowStarted` event of its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    // =========================================================================
    // Workflow Lifecycle Events
    // =========================================================================
    /// Workflow (or a new generation of it) was started with the given input
    WorkflowStarted {
        input: serde_json::Value,
        generation: u32,
    },

    /// Workflow completed successfully
    WorkflowCompleted { result: serde_json::Value },

    /// Workflow failed with an error
    WorkflowFailed { error: WorkflowError },

    /// Workflow restarted itself with a new input
    ContinuedAsNew { input: serde_json::Value },

    /// Workflow was terminated from outside
    WorkflowTerminated { reason: String },

    // =========================================================================
    // Activity Lifecycle Events
    // =========================================================================
    /// Activity was scheduled for execution
    ActivityScheduled {
        activity_id: String,
        activity_type: String,
        app_id: Option<String>,
    },

    /// Activity completed successfully
    ActivityCompleted {
        activity_id: String,
        result: serde_json::Value,
    },

    /// Activity failed after its last attempt
    ActivityFailed {
        activity_id: String,
        error: ActivityError,
        attempts: u32,
    },

    // =========================================================================
    // Child Workflow Events
    // =========================================================================
    /// Child workflow instance was started
    ChildWorkflowScheduled {
        workflow_id: String,
        workflow_type: String,
        instance_id: String,
        app_id: Option<String>,
    },

    /// Child workflow completed successfully
    ChildWorkflowCompleted {
        workflow_id: String,
        result: serde_json::Value,
    },

    /// Child workflow failed
    ChildWorkflowFailed {
        workflow_id: String,
        error: WorkflowError,
    },
}

impl WorkflowEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::WorkflowStarted { .. } => "workflow_started",
            Self::WorkflowCompleted { .. } => "workflow_completed",
            Self::WorkflowFailed { .. } => "workflow_failed",
            Self::ContinuedAsNew { .. } => "continued_as_new",
            Self::WorkflowTerminated { .. } => "workflow_terminated",
            Self::ActivityScheduled { .. } => "activity_scheduled",
            Self::ActivityCompleted { .. } => "activity_completed",
            Self::ActivityFailed { .. } => "activity_failed",
            Self::ChildWorkflowScheduled { .. } => "child_workflow_scheduled",
            Self::ChildWorkflowCompleted { .. } => "child_workflow_completed",
            Self::ChildWorkflowFailed { .. } => "child_workflow_failed",
        }
    }

    /// Check if this event ends the instance
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::WorkflowCompleted { .. }
                | Self::WorkflowFailed { .. }
                | Self::WorkflowTerminated { .. }
        )
    }
}

/// A history event with its position and time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: WorkflowEvent,
}
