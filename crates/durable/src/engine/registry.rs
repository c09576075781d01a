//! Registry for type-erased workflow and activity creation
//!
//! The registry maps names to workflow factories and activity executors, so
//! the engine can start instances and run activities from JSON without
//! knowing the concrete types.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::activity::{Activity, ActivityContext, ActivityError};
use crate::workflow::{Workflow, WorkflowAction, WorkflowContext, WorkflowError};

/// Type-erased workflow interface
///
/// All parameters and return values are JSON.
pub trait AnyWorkflow: Send + Sync {
    /// Get the workflow type identifier
    fn workflow_type(&self) -> &'static str;

    fn on_start(&mut self, ctx: &WorkflowContext) -> Vec<WorkflowAction>;

    fn on_activity_completed(
        &mut self,
        ctx: &WorkflowContext,
        activity_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction>;

    fn on_activity_failed(
        &mut self,
        ctx: &WorkflowContext,
        activity_id: &str,
        error: &ActivityError,
    ) -> Vec<WorkflowAction>;

    fn on_child_workflow_completed(
        &mut self,
        ctx: &WorkflowContext,
        workflow_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction>;

    fn on_child_workflow_failed(
        &mut self,
        ctx: &WorkflowContext,
        workflow_id: &str,
        error: &WorkflowError,
    ) -> Vec<WorkflowAction>;
}

/// Wrapper that implements AnyWorkflow for any Workflow
struct WorkflowWrapper<W: Workflow> {
    inner: W,
}

impl<W: Workflow> AnyWorkflow for WorkflowWrapper<W> {
    fn workflow_type(&self) -> &'static str {
        W::TYPE
    }

    fn on_start(&mut self, ctx: &WorkflowContext) -> Vec<WorkflowAction> {
        self.inner.on_start(ctx)
    }

    fn on_activity_completed(
        &mut self,
        ctx: &WorkflowContext,
        activity_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction> {
        self.inner.on_activity_completed(ctx, activity_id, result)
    }

    fn on_activity_failed(
        &mut self,
        ctx: &WorkflowContext,
        activity_id: &str,
        error: &ActivityError,
    ) -> Vec<WorkflowAction> {
        self.inner.on_activity_failed(ctx, activity_id, error)
    }

    fn on_child_workflow_completed(
        &mut self,
        ctx: &WorkflowContext,
        workflow_id: &str,
        result: Value,
    ) -> Vec<WorkflowAction> {
        self.inner.on_child_workflow_completed(ctx, workflow_id, result)
    }

    fn on_child_workflow_failed(
        &mut self,
        ctx: &WorkflowContext,
        workflow_id: &str,
        error: &WorkflowError,
    ) -> Vec<WorkflowAction> {
        self.inner.on_child_workflow_failed(ctx, workflow_id, error)
    }
}

/// Type-erased activity interface
#[async_trait]
pub trait AnyActivity: Send + Sync {
    /// Get the activity type identifier
    fn activity_type(&self) -> &'static str;

    /// Execute with JSON input and output
    async fn execute(&self, ctx: &ActivityContext, input: Value) -> Result<Value, ActivityError>;
}

struct ActivityWrapper<A: Activity> {
    inner: A,
}

#[async_trait]
impl<A: Activity> AnyActivity for ActivityWrapper<A> {
    fn activity_type(&self) -> &'static str {
        A::TYPE
    }

    async fn execute(&self, ctx: &ActivityContext, input: Value) -> Result<Value, ActivityError> {
        // Input that does not match the activity's type will never succeed
        let typed_input: A::Input = serde_json::from_value(input).map_err(|e| {
            ActivityError::non_retryable(format!("invalid input for {}: {e}", A::TYPE))
                .with_type("INVALID_INPUT")
        })?;

        let output = self.inner.execute(ctx, typed_input).await?;

        serde_json::to_value(output).map_err(|e| {
            ActivityError::non_retryable(format!("failed to serialize output of {}: {e}", A::TYPE))
                .with_type("INVALID_OUTPUT")
        })
    }
}

/// Factory function type for creating workflows from JSON input
pub type WorkflowFactory =
    Box<dyn Fn(Value) -> Result<Box<dyn AnyWorkflow>, serde_json::Error> + Send + Sync>;

/// Registry of workflow factories and activity executors
///
/// # Example
///
/// ```ignore
/// let mut registry = WorkflowRegistry::new();
/// registry.register_workflow::<RootWorkflow>();
/// registry.register_activity(DoubleActivity);
/// ```
pub struct WorkflowRegistry {
    factories: HashMap<String, WorkflowFactory>,
    activities: HashMap<String, Arc<dyn AnyActivity>>,
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            activities: HashMap::new(),
        }
    }

    /// Register a workflow type under `W::TYPE`
    pub fn register_workflow<W: Workflow>(&mut self) -> &mut Self {
        let factory: WorkflowFactory = Box::new(|input: Value| {
            let typed_input: W::Input = serde_json::from_value(input)?;
            Ok(Box::new(WorkflowWrapper {
                inner: W::new(typed_input),
            }) as Box<dyn AnyWorkflow>)
        });

        self.factories.insert(W::TYPE.to_string(), factory);
        self
    }

    /// Register an activity under `A::TYPE`
    pub fn register_activity<A: Activity>(&mut self, activity: A) -> &mut Self {
        self.activities.insert(
            A::TYPE.to_string(),
            Arc::new(ActivityWrapper { inner: activity }),
        );
        self
    }

    /// Check if a workflow type is registered
    pub fn contains_workflow(&self, workflow_type: &str) -> bool {
        self.factories.contains_key(workflow_type)
    }

    /// Check if an activity type is registered
    pub fn contains_activity(&self, activity_type: &str) -> bool {
        self.activities.contains_key(activity_type)
    }

    /// Create a workflow instance from type name and JSON input
    pub fn create_workflow(
        &self,
        workflow_type: &str,
        input: Value,
    ) -> Result<Box<dyn AnyWorkflow>, RegistryError> {
        let factory = self
            .factories
            .get(workflow_type)
            .ok_or_else(|| RegistryError::UnknownWorkflowType(workflow_type.to_string()))?;

        factory(input).map_err(RegistryError::Deserialization)
    }

    /// Look up an activity executor
    pub fn activity(&self, activity_type: &str) -> Result<Arc<dyn AnyActivity>, RegistryError> {
        self.activities
            .get(activity_type)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownActivityType(activity_type.to_string()))
    }

    /// Get all registered workflow type names
    pub fn workflow_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|s| s.as_str())
    }

    /// Get all registered activity type names
    pub fn activity_types(&self) -> impl Iterator<Item = &str> {
        self.activities.keys().map(|s| s.as_str())
    }
}

impl fmt::Debug for WorkflowRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowRegistry")
            .field("workflow_types", &self.factories.keys().collect::<Vec<_>>())
            .field("activity_types", &self.activities.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Errors from registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Workflow type not registered
    #[error("unknown workflow type: {0}")]
    UnknownWorkflowType(String),

    /// Activity type not registered
    #[error("unknown activity type: {0}")]
    UnknownActivityType(String),

    /// Failed to deserialize workflow input
    #[error("failed to deserialize workflow input: {0}")]
    Deserialization(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestInput {
        value: i64,
    }

    struct TestWorkflow {
        input: TestInput,
    }

    impl Workflow for TestWorkflow {
        const TYPE: &'static str = "test_workflow";
        type Input = TestInput;

        fn new(input: Self::Input) -> Self {
            Self { input }
        }

        fn on_start(&mut self, _ctx: &WorkflowContext) -> Vec<WorkflowAction> {
            vec![WorkflowAction::schedule_activity(
                "compute",
                "double",
                json!(self.input.value),
            )]
        }

        fn on_activity_completed(
            &mut self,
            _ctx: &WorkflowContext,
            _activity_id: &str,
            result: Value,
        ) -> Vec<WorkflowAction> {
            vec![WorkflowAction::complete(result)]
        }
    }

    struct Double;

    #[async_trait]
    impl Activity for Double {
        const TYPE: &'static str = "double";
        type Input = i64;
        type Output = i64;

        async fn execute(&self, _ctx: &ActivityContext, n: i64) -> Result<i64, ActivityError> {
            Ok(n * 2)
        }
    }

    fn ctx() -> WorkflowContext {
        WorkflowContext::new("instance-1", "test_workflow", "app", Utc::now())
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = WorkflowRegistry::new();
        registry.register_workflow::<TestWorkflow>();

        assert!(registry.contains_workflow("test_workflow"));
        assert!(!registry.contains_workflow("unknown"));

        let mut workflow = registry
            .create_workflow("test_workflow", json!({ "value": 42 }))
            .expect("should create workflow");

        assert_eq!(workflow.workflow_type(), "test_workflow");
        let actions = workflow.on_start(&ctx());
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], WorkflowAction::ScheduleActivity { .. }));
    }

    #[test]
    fn test_unknown_workflow_type() {
        let registry = WorkflowRegistry::new();
        let result = registry.create_workflow("unknown", json!({}));

        assert!(matches!(result, Err(RegistryError::UnknownWorkflowType(_))));
    }

    #[test]
    fn test_invalid_input() {
        let mut registry = WorkflowRegistry::new();
        registry.register_workflow::<TestWorkflow>();

        let result = registry.create_workflow("test_workflow", json!({}));
        assert!(matches!(result, Err(RegistryError::Deserialization(_))));
    }

    #[test]
    fn test_default_child_callbacks_fail() {
        let mut registry = WorkflowRegistry::new();
        registry.register_workflow::<TestWorkflow>();
        let mut workflow = registry
            .create_workflow("test_workflow", json!({ "value": 1 }))
            .unwrap();

        let actions = workflow.on_child_workflow_failed(&ctx(), "child", &WorkflowError::new("x"));
        assert!(matches!(actions[0], WorkflowAction::FailWorkflow { .. }));
    }

    #[tokio::test]
    async fn test_activity_execution() {
        let mut registry = WorkflowRegistry::new();
        registry.register_activity(Double);

        let activity = registry.activity("double").unwrap();
        let ctx = ActivityContext::new("instance-1", "compute", 1, 1);

        assert_eq!(activity.execute(&ctx, json!(21)).await.unwrap(), json!(42));
    }

    #[tokio::test]
    async fn test_activity_bad_input_is_not_retryable() {
        let mut registry = WorkflowRegistry::new();
        registry.register_activity(Double);

        let activity = registry.activity("double").unwrap();
        let ctx = ActivityContext::new("instance-1", "compute", 1, 1);
        let error = activity.execute(&ctx, json!("nope")).await.unwrap_err();

        assert!(!error.retryable);
        assert_eq!(error.error_type.as_deref(), Some("INVALID_INPUT"));
    }

    #[test]
    fn test_unknown_activity_type() {
        let registry = WorkflowRegistry::new();
        assert!(matches!(
            registry.activity("missing"),
            Err(RegistryError::UnknownActivityType(_))
        ));
    }

    #[test]
    fn test_registry_debug() {
        let mut registry = WorkflowRegistry::new();
        registry
            .register_workflow::<TestWorkflow>()
            .register_activity(Double);

        let debug_str = format!("{:?}", registry);
        assert!(debug_str.contains("test_workflow"));
        assert!(debug_str.contains("double"));
    }
}
