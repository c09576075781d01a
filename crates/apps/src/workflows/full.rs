//! Feature coverage workflows of the `workflows-full` app
//!
//! `RootWorkflow` walks through an activity call, local and cross-app child
//! workflows and continue-as-new children, checking every result.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use testapps_durable::{
    Activity, ActivityContext, ActivityError, Workflow, WorkflowAction, WorkflowContext,
    WorkflowError, WorkflowRegistry,
};
use tracing::debug;

use super::expect_number;

/// App id the cross-app children are addressed to
pub const REMOTE_APP_ID: &str = "workflows-full-go-2";

/// Parallel activities must finish together faster than this
const PARALLEL_LIMIT: Duration = Duration::from_secs(2);

/// Sleeps one second, then doubles its input
pub struct DoubleActivity;

#[async_trait]
impl Activity for DoubleActivity {
    const TYPE: &'static str = "DoubleActivity";
    type Input = i64;
    type Output = i64;

    async fn execute(&self, _ctx: &ActivityContext, n: i64) -> Result<i64, ActivityError> {
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(n * 2)
    }
}

// =============================================================================
// RootWorkflow
// =============================================================================

/// Next call of the root workflow and the result it must produce
fn root_step(step: usize) -> Option<(WorkflowAction, i64)> {
    let step = match step {
        0 => (
            WorkflowAction::schedule_activity("double", DoubleActivity::TYPE, json!(4)),
            8,
        ),
        1 => (
            WorkflowAction::child_workflow(
                "async-local",
                ChildWorkflowAsyncActivities::TYPE,
                json!(4),
            ),
            16,
        ),
        2 => (
            WorkflowAction::child_workflow_on(
                REMOTE_APP_ID,
                "async-remote",
                ChildWorkflowAsyncActivities::TYPE,
                json!(5),
            ),
            20,
        ),
        3 => (
            WorkflowAction::child_workflow(
                "n-times-local",
                ChildWorkflowNTimes::TYPE,
                json!(NTimesInput { n: 4, times: 3 }),
            ),
            32,
        ),
        4 => (
            WorkflowAction::child_workflow_on(
                REMOTE_APP_ID,
                "n-times-remote",
                ChildWorkflowNTimes::TYPE,
                json!(NTimesInput { n: 5, times: 3 }),
            ),
            40,
        ),
        _ => return None,
    };
    Some(step)
}

/// Runs the feature checks one after another
pub struct RootWorkflow {
    step: usize,
    expected: i64,
}

impl RootWorkflow {
    fn schedule_next(&mut self) -> Vec<WorkflowAction> {
        match root_step(self.step) {
            Some((action, expected)) => {
                self.expected = expected;
                vec![action]
            }
            None => vec![WorkflowAction::complete(Value::Null)],
        }
    }

    fn check(&mut self, result: &Value) -> Vec<WorkflowAction> {
        let number = match expect_number(result) {
            Ok(number) => number,
            Err(error) => return vec![WorkflowAction::fail(error)],
        };
        if number != self.expected {
            return vec![WorkflowAction::fail(
                WorkflowError::new(format!("number is not {}, is {number}", self.expected))
                    .with_code("UNEXPECTED_RESULT"),
            )];
        }

        self.step += 1;
        self.schedule_next()
    }
}

impl Workflow for RootWorkflow {
    const TYPE: &'static str = "RootWorkflow";
    type Input = Value;

    fn new(_input: Value) -> Self {
        Self {
            step: 0,
            expected: 0,
        }
    }

    fn on_start(&mut self, ctx: &WorkflowContext) -> Vec<WorkflowAction> {
        debug!(instance_id = %ctx.instance_id(), "RootWorkflow started");
        self.schedule_next()
    }

    fn on_activity_completed(
        &mut self,
        _ctx: &WorkflowContext,
        _activity_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction> {
        self.check(&result)
    }

    fn on_child_workflow_completed(
        &mut self,
        _ctx: &WorkflowContext,
        _workflow_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction> {
        self.check(&result)
    }
}

// =============================================================================
// ChildWorkflowAsyncActivities
// =============================================================================

/// Doubles its input twice in parallel and returns the sum (4x the input)
///
/// Fails when the two activities took two seconds or more together, which
/// means they ran one after the other.
pub struct ChildWorkflowAsyncActivities {
    n: i64,
    started_at: Option<DateTime<Utc>>,
    results: Vec<i64>,
}

impl Workflow for ChildWorkflowAsyncActivities {
    const TYPE: &'static str = "ChildWorkflowAsyncActivities";
    type Input = i64;

    fn new(n: i64) -> Self {
        Self {
            n,
            started_at: None,
            results: Vec::with_capacity(2),
        }
    }

    fn on_start(&mut self, ctx: &WorkflowContext) -> Vec<WorkflowAction> {
        self.started_at = Some(ctx.current_time());
        vec![
            WorkflowAction::schedule_activity("a1", DoubleActivity::TYPE, json!(self.n)),
            WorkflowAction::schedule_activity("a2", DoubleActivity::TYPE, json!(self.n)),
        ]
    }

    fn on_activity_completed(
        &mut self,
        ctx: &WorkflowContext,
        _activity_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction> {
        match expect_number(&result) {
            Ok(number) => self.results.push(number),
            Err(error) => return vec![WorkflowAction::fail(error)],
        }
        if self.results.len() < 2 {
            return vec![];
        }

        let elapsed = self
            .started_at
            .map(|started| ctx.current_time() - started)
            .and_then(|elapsed| elapsed.to_std().ok())
            .unwrap_or_default();
        if elapsed >= PARALLEL_LIMIT {
            return vec![WorkflowAction::fail(
                WorkflowError::new("activities didn't run in parallel").with_code("NOT_PARALLEL"),
            )];
        }

        vec![WorkflowAction::complete(json!(self.results.iter().sum::<i64>()))]
    }
}

// =============================================================================
// ChildWorkflowNTimes
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NTimesInput {
    pub n: i64,
    pub times: u32,
}

/// Doubles `n` once per generation, continuing as new until `times` is 1
///
/// Returns `n * 2^times`.
pub struct ChildWorkflowNTimes {
    input: NTimesInput,
}

impl Workflow for ChildWorkflowNTimes {
    const TYPE: &'static str = "ChildWorkflowNTimes";
    type Input = NTimesInput;

    fn new(input: NTimesInput) -> Self {
        Self { input }
    }

    fn on_start(&mut self, ctx: &WorkflowContext) -> Vec<WorkflowAction> {
        debug!(
            instance_id = %ctx.instance_id(),
            generation = ctx.generation(),
            n = self.input.n,
            times = self.input.times,
            "ChildWorkflowNTimes round"
        );
        vec![WorkflowAction::schedule_activity(
            "double",
            DoubleActivity::TYPE,
            json!(self.input.n),
        )]
    }

    fn on_activity_completed(
        &mut self,
        _ctx: &WorkflowContext,
        _activity_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction> {
        let number = match expect_number(&result) {
            Ok(number) => number,
            Err(error) => return vec![WorkflowAction::fail(error)],
        };

        if self.input.times > 1 {
            vec![WorkflowAction::continue_as_new(json!(NTimesInput {
                n: number,
                times: self.input.times - 1,
            }))]
        } else {
            vec![WorkflowAction::complete(json!(number))]
        }
    }
}

pub fn registry() -> WorkflowRegistry {
    let mut registry = WorkflowRegistry::new();
    registry
        .register_workflow::<RootWorkflow>()
        .register_workflow::<ChildWorkflowAsyncActivities>()
        .register_workflow::<ChildWorkflowNTimes>()
        .register_activity(DoubleActivity);
    registry
}
