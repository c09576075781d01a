//! Workflow actions and activity options

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::WorkflowError;
use crate::reliability::RetryPolicy;

/// Actions a workflow can request
///
/// These are the commands a workflow issues in response to its callbacks.
/// Each applied action is recorded as a [`WorkflowEvent`](super::WorkflowEvent).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowAction {
    /// Schedule an activity for execution
    ScheduleActivity {
        /// Unique identifier for this activity within the workflow
        activity_id: String,

        /// Registered name of the activity to execute
        activity_type: String,

        /// Input data for the activity (JSON)
        input: serde_json::Value,

        /// Execution options (retries, timeout, target app)
        options: ActivityOptions,
    },

    /// Schedule a child workflow
    ScheduleChildWorkflow {
        /// Identifier of the child within the parent; also the instance id suffix
        workflow_id: String,

        /// Registered name of the workflow to start
        workflow_type: String,

        /// Input for the child workflow
        input: serde_json::Value,

        /// App that should run the child (None = this app)
        app_id: Option<String>,
    },

    /// Complete the workflow successfully with a result
    CompleteWorkflow {
        /// Result value (JSON)
        result: serde_json::Value,
    },

    /// Fail the workflow with an error
    FailWorkflow {
        /// Error details
        error: WorkflowError,
    },

    /// Restart this instance with a new input and fresh state
    ContinueAsNew {
        /// Input of the next generation
        input: serde_json::Value,
    },
}

impl WorkflowAction {
    /// Create a schedule activity action with default options
    pub fn schedule_activity(
        activity_id: impl Into<String>,
        activity_type: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self::ScheduleActivity {
            activity_id: activity_id.into(),
            activity_type: activity_type.into(),
            input,
            options: ActivityOptions::default(),
        }
    }

    /// Create a schedule activity action with explicit options
    pub fn schedule_activity_with(
        activity_id: impl Into<String>,
        activity_type: impl Into<String>,
        input: serde_json::Value,
        options: ActivityOptions,
    ) -> Self {
        Self::ScheduleActivity {
            activity_id: activity_id.into(),
            activity_type: activity_type.into(),
            input,
            options,
        }
    }

    /// Create a child workflow action running in this app
    pub fn child_workflow(
        workflow_id: impl Into<String>,
        workflow_type: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self::ScheduleChildWorkflow {
            workflow_id: workflow_id.into(),
            workflow_type: workflow_type.into(),
            input,
            app_id: None,
        }
    }

    /// Create a child workflow action addressed to another app
    pub fn child_workflow_on(
        app_id: impl Into<String>,
        workflow_id: impl Into<String>,
        workflow_type: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self::ScheduleChildWorkflow {
            workflow_id: workflow_id.into(),
            workflow_type: workflow_type.into(),
            input,
            app_id: Some(app_id.into()),
        }
    }

    /// Create a complete workflow action
    pub fn complete(result: serde_json::Value) -> Self {
        Self::CompleteWorkflow { result }
    }

    /// Create a fail workflow action
    pub fn fail(error: WorkflowError) -> Self {
        Self::FailWorkflow { error }
    }

    /// Create a continue-as-new action
    pub fn continue_as_new(input: serde_json::Value) -> Self {
        Self::ContinueAsNew { input }
    }

    /// Whether this action ends the current generation of the instance
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CompleteWorkflow { .. } | Self::FailWorkflow { .. } | Self::ContinueAsNew { .. }
        )
    }
}

/// Options for activity execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityOptions {
    /// Retry policy for this activity (None = a single attempt)
    pub retry_policy: Option<RetryPolicy>,

    /// App that should run the activity (None = this app)
    pub app_id: Option<String>,

    /// Maximum time for one attempt (from start to completion)
    #[serde(with = "duration_serde")]
    pub start_to_close_timeout: Duration,
}

impl Default for ActivityOptions {
    fn default() -> Self {
        Self {
            retry_policy: None,
            app_id: None,
            start_to_close_timeout: Duration::from_secs(300),
        }
    }
}

impl ActivityOptions {
    /// Create options with a specific retry policy
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Address the activity to another app
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Set the start-to-close timeout
    pub fn with_start_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout = timeout;
        self
    }

    /// Maximum attempts allowed by the retry policy
    pub fn max_attempts(&self) -> u32 {
        self.retry_policy
            .as_ref()
            .map(|p| p.max_attempts.max(1))
            .unwrap_or(1)
    }
}

/// Serde support for Duration (as milliseconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
