//! Workflow trait definition

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{WorkflowAction, WorkflowContext};
use crate::activity::ActivityError;

/// Error type for workflow failures
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct WorkflowError {
    /// Error message
    pub message: String,

    /// Error code for programmatic handling
    pub code: Option<String>,

    /// Whether this error is retryable
    pub retryable: bool,
}

impl WorkflowError {
    /// Create a new workflow error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            retryable: false,
        }
    }

    /// Create a retryable error
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            retryable: true,
        }
    }

    /// Set the error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for WorkflowError {}

impl From<&ActivityError> for WorkflowError {
    fn from(err: &ActivityError) -> Self {
        let error = Self::new(format!("activity failed: {}", err.message));
        match &err.error_type {
            Some(code) => error.with_code(code.clone()),
            None => error,
        }
    }
}

/// A workflow is a deterministic state machine driven by completions
///
/// Workflows define:
/// - How to start execution (`on_start`)
/// - How to react to activity results (`on_activity_completed`, `on_activity_failed`)
/// - How to react to child workflow results (`on_child_workflow_completed`,
///   `on_child_workflow_failed`)
///
/// Each callback returns the actions to take next. The instance ends when a
/// callback returns [`WorkflowAction::CompleteWorkflow`] or
/// [`WorkflowAction::FailWorkflow`], and restarts with fresh state on
/// [`WorkflowAction::ContinueAsNew`].
///
/// # Determinism
///
/// Given the same inputs and completions (including `ctx.current_time()`),
/// a workflow must return the same actions. Do not read clocks or random
/// numbers here; do that in activities.
///
/// # Example
///
/// ```ignore
/// struct Doubler { n: i64 }
///
/// impl Workflow for Doubler {
///     const TYPE: &'static str = "Doubler";
///     type Input = i64;
///
///     fn new(n: i64) -> Self { Self { n } }
///
///     fn on_start(&mut self, _ctx: &WorkflowContext) -> Vec<WorkflowAction> {
///         vec![WorkflowAction::schedule_activity("double", "DoubleActivity", json!(self.n))]
///     }
///
///     fn on_activity_completed(
///         &mut self,
///         _ctx: &WorkflowContext,
///         _activity_id: &str,
///         result: Value,
///     ) -> Vec<WorkflowAction> {
///         vec![WorkflowAction::complete(result)]
///     }
/// }
/// ```
pub trait Workflow: Send + Sync + 'static {
    /// Name the workflow is registered and scheduled under
    const TYPE: &'static str;

    /// Input type for starting the workflow
    type Input: Serialize + DeserializeOwned + Send;

    /// Create a new workflow instance from input
    ///
    /// Called on start and again on every continue-as-new.
    fn new(input: Self::Input) -> Self;

    /// Called when the instance starts
    fn on_start(&mut self, ctx: &WorkflowContext) -> Vec<WorkflowAction>;

    /// Called when an activity completes successfully
    fn on_activity_completed(
        &mut self,
        ctx: &WorkflowContext,
        activity_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction>;

    /// Called when an activity fails after its retries are exhausted
    ///
    /// Fails the workflow by default.
    fn on_activity_failed(
        &mut self,
        ctx: &WorkflowContext,
        activity_id: &str,
        error: &ActivityError,
    ) -> Vec<WorkflowAction> {
        let _ = (ctx, activity_id);
        vec![WorkflowAction::fail(WorkflowError::from(error))]
    }

    /// Called when a child workflow completes successfully
    fn on_child_workflow_completed(
        &mut self,
        ctx: &WorkflowContext,
        workflow_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction> {
        let _ = (ctx, result);
        vec![WorkflowAction::fail(WorkflowError::new(format!(
            "unexpected child workflow completion: {workflow_id}"
        )))]
    }

    /// Called when a child workflow fails
    ///
    /// Fails the workflow by default.
    fn on_child_workflow_failed(
        &mut self,
        ctx: &WorkflowContext,
        workflow_id: &str,
        error: &WorkflowError,
    ) -> Vec<WorkflowAction> {
        let _ = ctx;
        vec![WorkflowAction::fail(WorkflowError::new(format!(
            "child workflow {workflow_id} failed: {error}"
        )))]
    }
}
