//! Single-activity workflow of the `workflows` and `workflows-stress` apps

use serde_json::{json, Value};
use testapps_durable::{
    Activity, Workflow, WorkflowAction, WorkflowContext, WorkflowRegistry,
};
use tracing::debug;

use super::{expect_number, TestActivity};

/// Calls [`TestActivity`] once and reports the number it returned
pub struct TestWorkflow {
    input: String,
}

impl Workflow for TestWorkflow {
    const TYPE: &'static str = "TestWorkflow";
    type Input = String;

    fn new(input: String) -> Self {
        Self { input }
    }

    fn on_start(&mut self, ctx: &WorkflowContext) -> Vec<WorkflowAction> {
        debug!(instance_id = %ctx.instance_id(), input = %self.input, "TestWorkflow started");
        vec![WorkflowAction::schedule_activity(
            "number",
            TestActivity::TYPE,
            Value::Null,
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
        .register_workflow::<TestWorkflow>()
        .register_activity(TestActivity);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use testapps_durable::{
        EngineConfig, RuntimeStatus, ScheduleOptions, WorkflowClient, WorkflowEngine,
    };

    #[tokio::test]
    async fn test_completes_with_number() {
        let engine = WorkflowEngine::new(EngineConfig::new("workflows"), registry());
        let id = engine
            .schedule_new_workflow(
                TestWorkflow::TYPE,
                ScheduleOptions::new().with_input(&"2024-01-01T00:00:00Z").unwrap(),
            )
            .await
            .unwrap();

        let metadata = engine
            .wait_for_workflow_completion(&id, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(metadata.runtime_status, RuntimeStatus::Completed);

        let output: String = metadata.output().unwrap().unwrap();
        let number: u32 = output
            .strip_prefix("Workflow completed with number: ")
            .unwrap()
            .parse()
            .unwrap();
        assert!(number < crate::workflows::RANDOM_NUMBER_LIMIT);
    }
}
