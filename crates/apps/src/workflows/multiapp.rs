//! Workflow chain spread over three apps (`multiapp` app)
//!
//! `TestWorkflow` runs `TestChildWorkflow` on [`CHILD_APP_ID`], which runs
//! `TestActivity` on [`ACTIVITY_APP_ID`].

use serde_json::Value;
use testapps_durable::{
    Activity, ActivityOptions, Workflow, WorkflowAction, WorkflowContext, WorkflowError,
    WorkflowRegistry,
};
use tracing::debug;

use super::{expect_number, TestActivity};

pub const CHILD_APP_ID: &str = "multiapp-3";
pub const ACTIVITY_APP_ID: &str = "multiapp-2";

fn complete_with_number(result: &Value) -> Vec<WorkflowAction> {
    match expect_number(result) {
        Ok(number) => vec![WorkflowAction::complete(Value::from(number))],
        Err(error) => vec![WorkflowAction::fail(error)],
    }
}

pub struct TestWorkflow;

impl Workflow for TestWorkflow {
    const TYPE: &'static str = "TestWorkflow";
    type Input = Value;

    fn new(_input: Value) -> Self {
        Self
    }

    fn on_start(&mut self, ctx: &WorkflowContext) -> Vec<WorkflowAction> {
        debug!(instance_id = %ctx.instance_id(), "TestWorkflow called");
        vec![WorkflowAction::child_workflow_on(
            CHILD_APP_ID,
            "child",
            TestChildWorkflow::TYPE,
            Value::Null,
        )]
    }

    fn on_activity_completed(
        &mut self,
        _ctx: &WorkflowContext,
        activity_id: &str,
        _result: Value,
    ) -> Vec<WorkflowAction> {
        vec![WorkflowAction::fail(WorkflowError::new(format!(
            "unexpected activity completion: {activity_id}"
        )))]
    }

    fn on_child_workflow_completed(
        &mut self,
        _ctx: &WorkflowContext,
        _workflow_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction> {
        complete_with_number(&result)
    }
}

pub struct TestChildWorkflow;

impl Workflow for TestChildWorkflow {
    const TYPE: &'static str = "TestChildWorkflow";
    type Input = Value;

    fn new(_input: Value) -> Self {
        Self
    }

    fn on_start(&mut self, ctx: &WorkflowContext) -> Vec<WorkflowAction> {
        debug!(instance_id = %ctx.instance_id(), "TestChildWorkflow called");
        vec![WorkflowAction::schedule_activity_with(
            "number",
            TestActivity::TYPE,
            Value::Null,
            ActivityOptions::default().with_app_id(ACTIVITY_APP_ID),
        )]
    }

    fn on_activity_completed(
        &mut self,
        _ctx: &WorkflowContext,
        _activity_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction> {
        complete_with_number(&result)
    }
}

pub fn registry() -> WorkflowRegistry {
    let mut registry = WorkflowRegistry::new();
    registry
        .register_workflow::<TestWorkflow>()
        .register_workflow::<TestChildWorkflow>()
        .register_activity(TestActivity);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use testapps_durable::{
        EngineConfig, RuntimeStatus, ScheduleOptions, WorkflowClient, WorkflowEngine,
        WorkflowEvent,
    };

    #[tokio::test]
    async fn test_chain_returns_activity_number() {
        let engine = WorkflowEngine::new(EngineConfig::new("multiapp"), registry());
        let id = engine
            .schedule_new_workflow(
                TestWorkflow::TYPE,
                ScheduleOptions::new().with_instance_id("chain"),
            )
            .await
            .unwrap();

        let metadata = engine
            .wait_for_workflow_completion(&id, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(metadata.runtime_status, RuntimeStatus::Completed);
        let number: i64 = metadata.output().unwrap().unwrap();
        assert!((0..i64::from(crate::workflows::RANDOM_NUMBER_LIMIT)).contains(&number));

        let parent = engine.history("chain").unwrap();
        assert!(parent.iter().any(|entry| matches!(
            &entry.event,
            WorkflowEvent::ChildWorkflowScheduled { app_id: Some(app), .. } if app == CHILD_APP_ID
        )));

        let child = engine.history("chain:child").unwrap();
        assert!(child.iter().any(|entry| matches!(
            &entry.event,
            WorkflowEvent::ActivityScheduled { app_id: Some(app), .. } if app == ACTIVITY_APP_ID
        )));
    }
}
