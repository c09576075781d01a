//! Cross-app activity call with a retry policy (`workflows-crossapp` app)

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use testapps_durable::{
    Activity, ActivityContext, ActivityError, ActivityOptions, RetryPolicy, Workflow,
    WorkflowAction, WorkflowContext, WorkflowRegistry,
};
use tracing::debug;

use super::{expect_number, RandomNumberGenerator, TestActivity};

/// App id that owns `random_number_generator`
pub const TARGET_APP_ID: &str = "workflows-crossapp3";

/// Retry policy of the cross-app activity call
pub fn activity_retry_policy() -> RetryPolicy {
    RetryPolicy::exponential()
        .with_max_attempts(3)
        .with_initial_interval(Duration::from_millis(100))
        .with_backoff_coefficient(2.0)
        .with_max_interval(Duration::from_secs(1))
}

/// Local activity of this app; registered for callers addressing it
pub struct TestActivity2;

#[async_trait]
impl Activity for TestActivity2 {
    const TYPE: &'static str = "TestActivity2";
    type Input = ();
    type Output = u32;

    async fn execute(&self, ctx: &ActivityContext, input: ()) -> Result<u32, ActivityError> {
        debug!("TestActivity2 called");
        TestActivity.execute(ctx, input).await
    }
}

/// Calls `random_number_generator` on [`TARGET_APP_ID`]
pub struct TestWorkflow2;

impl Workflow for TestWorkflow2 {
    const TYPE: &'static str = "TestWorkflow2";
    type Input = Value;

    fn new(_input: Value) -> Self {
        Self
    }

    fn on_start(&mut self, ctx: &WorkflowContext) -> Vec<WorkflowAction> {
        debug!(instance_id = %ctx.instance_id(), "TestWorkflow2 called");
        vec![WorkflowAction::schedule_activity_with(
            "number",
            RandomNumberGenerator::TYPE,
            Value::Null,
            ActivityOptions::default()
                .with_app_id(TARGET_APP_ID)
                .with_retry(activity_retry_policy()),
        )]
    }

    fn on_activity_completed(
        &mut self,
        _ctx: &WorkflowContext,
        _activity_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction> {
        match expect_number(&result) {
            Ok(number) => vec![WorkflowAction::complete(json!(format!(
                "Workflow completed with number: {number}"
            )))],
            Err(error) => vec![WorkflowAction::fail(error)],
        }
    }
}

pub fn registry() -> WorkflowRegistry {
    let mut registry = WorkflowRegistry::new();
    registry
        .register_workflow::<TestWorkflow2>()
        .register_activity(TestActivity2)
        .register_activity(RandomNumberGenerator);
    registry
}
