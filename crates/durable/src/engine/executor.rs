//! In-process workflow engine
//!
//! The `WorkflowEngine` is responsible for:
//! - Starting new instances from registered workflows
//! - Driving each instance with one task that feeds completions back
//! - Running activities concurrently with retries and timeouts
//! - Child workflows, continue-as-new and termination

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::activity::{ActivityContext, ActivityError};
use crate::client::{
    ClientError, FailureDetails, ScheduleOptions, WorkflowClient, WorkflowMetadata,
};
use crate::persistence::{InMemoryInstanceStore, InstanceRecord, RuntimeStatus};
use crate::reliability::{with_start_to_close_timeout, RetryPolicy};
use crate::workflow::{
    ActivityOptions, HistoryEntry, WorkflowAction, WorkflowContext, WorkflowError, WorkflowEvent,
};

use super::registry::{AnyWorkflow, WorkflowRegistry};

/// Configuration for the workflow engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// App id reported to workflows and recorded as the local app
    pub app_id: String,
}

impl EngineConfig {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("testapps")
    }
}

/// What a completed task reports back to its instance
enum Completion {
    Activity {
        activity_id: String,
        result: Result<Value, (ActivityError, u32)>,
        at: DateTime<Utc>,
    },
    Child {
        workflow_id: String,
        result: Result<Value, WorkflowError>,
        at: DateTime<Utc>,
    },
}

/// How one generation of an instance ended
enum Outcome {
    Completed(Value),
    Failed(WorkflowError),
    ContinueAsNew(Value),
}

struct EngineInner {
    config: EngineConfig,
    registry: WorkflowRegistry,
    store: InMemoryInstanceStore,
    running: Mutex<HashMap<String, CancellationToken>>,
    epoch: (DateTime<Utc>, Instant),
}

/// In-process workflow engine
///
/// Cheap to clone; clones share the registry and the instance store.
///
/// # Example
///
/// ```ignore
/// let mut registry = WorkflowRegistry::new();
/// registry.register_workflow::<TestWorkflow>();
/// registry.register_activity(TestActivity);
///
/// let engine = WorkflowEngine::new(EngineConfig::new("workflows"), registry);
/// let id = engine
///     .schedule_new_workflow("TestWorkflow", ScheduleOptions::new())
///     .await?;
/// let metadata = engine
///     .wait_for_workflow_completion(&id, Duration::from_secs(30))
///     .await?;
/// ```
#[derive(Clone)]
pub struct WorkflowEngine {
    inner: Arc<EngineInner>,
}

impl WorkflowEngine {
    /// Create an engine over a populated registry
    pub fn new(config: EngineConfig, registry: WorkflowRegistry) -> Self {
        info!(
            app_id = %config.app_id,
            workflows = ?registry.workflow_types().collect::<Vec<_>>(),
            activities = ?registry.activity_types().collect::<Vec<_>>(),
            "workflow engine created"
        );

        Self {
            inner: Arc::new(EngineInner {
                config,
                registry,
                store: InMemoryInstanceStore::new(),
                running: Mutex::new(HashMap::new()),
                epoch: (Utc::now(), Instant::now()),
            }),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.inner.config.app_id
    }

    /// Get a reference to the instance store
    pub fn store(&self) -> &InMemoryInstanceStore {
        &self.inner.store
    }

    /// Get the history of an instance
    pub fn history(&self, instance_id: &str) -> Result<Vec<HistoryEntry>, ClientError> {
        Ok(self.inner.store.history(instance_id)?)
    }

    /// Number of instances currently being driven
    pub fn running_count(&self) -> usize {
        self.inner.running.lock().len()
    }

    /// Current time on the engine clock
    ///
    /// Follows tokio's clock, so paused time in tests moves it too.
    fn now(&self) -> DateTime<Utc> {
        let (wall, instant) = self.inner.epoch;
        let elapsed = chrono::Duration::from_std(instant.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        wall + elapsed
    }

    fn start_instance(
        &self,
        instance_id: &str,
        name: &str,
        input: Value,
        parent_instance_id: Option<&str>,
    ) -> Result<(), ClientError> {
        // Unknown names and bad input fail before anything is stored
        let workflow = self.inner.registry.create_workflow(name, input.clone())?;
        self.inner
            .store
            .create_instance(instance_id, name, input.clone(), parent_instance_id)?;

        let token = CancellationToken::new();
        self.inner
            .running
            .lock()
            .insert(instance_id.to_string(), token.clone());

        info!(
            instance_id = %instance_id,
            workflow = %name,
            parent = ?parent_instance_id,
            "workflow instance started"
        );

        tokio::spawn(
            self.clone()
                .drive(instance_id.to_string(), workflow, input, token),
        );
        Ok(())
    }

    fn drive(
        self,
        instance_id: String,
        mut workflow: Box<dyn AnyWorkflow>,
        mut input: Value,
        token: CancellationToken,
    ) -> BoxFuture<'static, ()> {
        async move {
            let mut generation = 0;
            let mut children = Vec::new();

            loop {
                let outcome = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    outcome = self.run_generation(
                        &instance_id,
                        workflow.as_mut(),
                        generation,
                        &input,
                        &mut children,
                    ) => Some(outcome),
                };

                match outcome {
                    Some(Outcome::Completed(result)) => {
                        self.finish_completed(&instance_id, result);
                        break;
                    }
                    Some(Outcome::Failed(error)) => {
                        self.finish_failed(&instance_id, error);
                        break;
                    }
                    Some(Outcome::ContinueAsNew(next_input)) => {
                        match self.continue_as_new(&instance_id, workflow.workflow_type(), &next_input)
                        {
                            Ok((next_workflow, next_generation)) => {
                                workflow = next_workflow;
                                generation = next_generation;
                                input = next_input;
                                self.terminate_children(&children);
                                children.clear();
                            }
                            Err(error) => {
                                self.finish_failed(&instance_id, error);
                                break;
                            }
                        }
                    }
                    None => {
                        debug!(instance_id = %instance_id, "workflow driver cancelled");
                        self.terminate_children(&children);
                        break;
                    }
                }
            }

            self.inner.running.lock().remove(&instance_id);
        }
        .boxed()
    }

    async fn run_generation(
        &self,
        instance_id: &str,
        workflow: &mut dyn AnyWorkflow,
        generation: u32,
        input: &Value,
        children: &mut Vec<String>,
    ) -> Outcome {
        self.record(
            instance_id,
            WorkflowEvent::WorkflowStarted {
                input: input.clone(),
                generation,
            },
        );

        let mut ctx = WorkflowContext::new(
            instance_id,
            workflow.workflow_type(),
            self.app_id(),
            self.now(),
        )
        .with_generation(generation);

        let mut tasks: JoinSet<Completion> = JoinSet::new();
        let mut actions = workflow.on_start(&ctx);

        loop {
            for action in actions {
                match action {
                    WorkflowAction::ScheduleActivity {
                        activity_id,
                        activity_type,
                        input,
                        options,
                    } => {
                        self.record(
                            instance_id,
                            WorkflowEvent::ActivityScheduled {
                                activity_id: activity_id.clone(),
                                activity_type: activity_type.clone(),
                                app_id: options.app_id.clone(),
                            },
                        );
                        tasks.spawn(self.clone().run_activity(
                            instance_id.to_string(),
                            activity_id,
                            activity_type,
                            input,
                            options,
                        ));
                    }
                    WorkflowAction::ScheduleChildWorkflow {
                        workflow_id,
                        workflow_type,
                        input,
                        app_id,
                    } => {
                        let child_id = format!("{instance_id}:{workflow_id}");
                        if let Some(app_id) = &app_id {
                            info!(
                                instance_id = %instance_id,
                                child = %child_id,
                                target_app = %app_id,
                                "resolving cross-app child workflow in local registry"
                            );
                        }
                        self.record(
                            instance_id,
                            WorkflowEvent::ChildWorkflowScheduled {
                                workflow_id: workflow_id.clone(),
                                workflow_type: workflow_type.clone(),
                                instance_id: child_id.clone(),
                                app_id,
                            },
                        );

                        match self.start_instance(&child_id, &workflow_type, input, Some(instance_id))
                        {
                            Ok(()) => {
                                children.push(child_id.clone());
                                tasks.spawn(self.clone().await_child(workflow_id, child_id));
                            }
                            Err(e) => {
                                let at = self.now();
                                tasks.spawn(async move {
                                    Completion::Child {
                                        workflow_id,
                                        result: Err(WorkflowError::new(format!(
                                            "failed to start child workflow: {e}"
                                        ))),
                                        at,
                                    }
                                });
                            }
                        }
                    }
                    WorkflowAction::CompleteWorkflow { result } => {
                        return Outcome::Completed(result)
                    }
                    WorkflowAction::FailWorkflow { error } => return Outcome::Failed(error),
                    WorkflowAction::ContinueAsNew { input } => {
                        return Outcome::ContinueAsNew(input)
                    }
                }
            }

            let completion = match tasks.join_next().await {
                Some(Ok(completion)) => completion,
                Some(Err(e)) => {
                    return Outcome::Failed(WorkflowError::new(format!("task failed: {e}")))
                }
                None => {
                    return Outcome::Failed(
                        WorkflowError::new(
                            "workflow stalled: no pending activities or child workflows",
                        )
                        .with_code("STALLED"),
                    )
                }
            };

            actions = match completion {
                Completion::Activity {
                    activity_id,
                    result,
                    at,
                } => {
                    ctx.advance_to(at);
                    match result {
                        Ok(result) => {
                            self.record(
                                instance_id,
                                WorkflowEvent::ActivityCompleted {
                                    activity_id: activity_id.clone(),
                                    result: result.clone(),
                                },
                            );
                            workflow.on_activity_completed(&ctx, &activity_id, result)
                        }
                        Err((error, attempts)) => {
                            self.record(
                                instance_id,
                                WorkflowEvent::ActivityFailed {
                                    activity_id: activity_id.clone(),
                                    error: error.clone(),
                                    attempts,
                                },
                            );
                            workflow.on_activity_failed(&ctx, &activity_id, &error)
                        }
                    }
                }
                Completion::Child {
                    workflow_id,
                    result,
                    at,
                } => {
                    ctx.advance_to(at);
                    match result {
                        Ok(result) => {
                            self.record(
                                instance_id,
                                WorkflowEvent::ChildWorkflowCompleted {
                                    workflow_id: workflow_id.clone(),
                                    result: result.clone(),
                                },
                            );
                            workflow.on_child_workflow_completed(&ctx, &workflow_id, result)
                        }
                        Err(error) => {
                            self.record(
                                instance_id,
                                WorkflowEvent::ChildWorkflowFailed {
                                    workflow_id: workflow_id.clone(),
                                    error: error.clone(),
                                },
                            );
                            workflow.on_child_workflow_failed(&ctx, &workflow_id, &error)
                        }
                    }
                }
            };
        }
    }

    async fn run_activity(
        self,
        instance_id: String,
        activity_id: String,
        activity_type: String,
        input: Value,
        options: ActivityOptions,
    ) -> Completion {
        if let Some(app_id) = &options.app_id {
            info!(
                instance_id = %instance_id,
                activity = %activity_type,
                target_app = %app_id,
                "resolving cross-app activity in local registry"
            );
        }

        let result = self
            .execute_with_retries(&instance_id, &activity_id, &activity_type, input, &options)
            .await;

        Completion::Activity {
            activity_id,
            result,
            at: self.now(),
        }
    }

    async fn execute_with_retries(
        &self,
        instance_id: &str,
        activity_id: &str,
        activity_type: &str,
        input: Value,
        options: &ActivityOptions,
    ) -> Result<Value, (ActivityError, u32)> {
        let activity = self.inner.registry.activity(activity_type).map_err(|e| {
            (
                ActivityError::non_retryable(e.to_string()).with_type("UNKNOWN_ACTIVITY"),
                0,
            )
        })?;

        let policy = options
            .retry_policy
            .clone()
            .unwrap_or_else(RetryPolicy::no_retry);
        let max_attempts = options.max_attempts();
        let started = Instant::now();
        let mut attempt = 1;

        loop {
            let ctx = ActivityContext::new(instance_id, activity_id, attempt, max_attempts);
            debug!(
                instance_id = %instance_id,
                activity_id = %activity_id,
                activity = %activity_type,
                attempt,
                task_execution_id = %ctx.task_execution_id,
                "executing activity"
            );

            let error = match with_start_to_close_timeout(
                options.start_to_close_timeout,
                activity.execute(&ctx, input.clone()),
            )
            .await
            {
                Ok(Ok(output)) => return Ok(output),
                Ok(Err(error)) => error,
                Err(timeout) => {
                    ActivityError::retryable(timeout.to_string()).with_type("START_TO_CLOSE_TIMEOUT")
                }
            };

            let next_delay = policy.delay_for_attempt(attempt + 1);
            let retry = error.retryable
                && policy.has_attempts_remaining(attempt)
                && policy.has_time_remaining(started.elapsed(), next_delay);

            if !retry {
                warn!(
                    instance_id = %instance_id,
                    activity_id = %activity_id,
                    activity = %activity_type,
                    attempt,
                    error = %error,
                    "activity failed"
                );
                return Err((error, attempt));
            }

            warn!(
                instance_id = %instance_id,
                activity_id = %activity_id,
                activity = %activity_type,
                attempt,
                delay_ms = next_delay.as_millis() as u64,
                error = %error,
                "activity attempt failed, retrying"
            );
            tokio::time::sleep(next_delay).await;
            attempt += 1;
        }
    }

    async fn await_child(self, workflow_id: String, child_id: String) -> Completion {
        let result = self.child_result(&child_id).await;
        Completion::Child {
            workflow_id,
            result,
            at: self.now(),
        }
    }

    async fn child_result(&self, child_id: &str) -> Result<Value, WorkflowError> {
        let mut rx = self
            .inner
            .store
            .subscribe(child_id)
            .map_err(|e| WorkflowError::new(e.to_string()))?;
        let status = rx
            .wait_for(|status| status.is_terminal())
            .await
            .map(|status| *status)
            .map_err(|_| WorkflowError::new(format!("child workflow {child_id} was purged")))?;

        let record = self
            .inner
            .store
            .get(child_id)
            .map_err(|e| WorkflowError::new(e.to_string()))?;

        match status {
            RuntimeStatus::Completed => Ok(record.output.unwrap_or(Value::Null)),
            RuntimeStatus::Failed => Err(record
                .failure
                .unwrap_or_else(|| WorkflowError::new("child workflow failed"))),
            other => Err(WorkflowError::new(format!(
                "child workflow {child_id} ended as {other}"
            ))),
        }
    }

    fn continue_as_new(
        &self,
        instance_id: &str,
        name: &str,
        input: &Value,
    ) -> Result<(Box<dyn AnyWorkflow>, u32), WorkflowError> {
        let workflow = self
            .inner
            .registry
            .create_workflow(name, input.clone())
            .map_err(|e| WorkflowError::new(e.to_string()))?;

        self.record(
            instance_id,
            WorkflowEvent::ContinuedAsNew {
                input: input.clone(),
            },
        );
        let generation = self
            .inner
            .store
            .continue_as_new(instance_id, input.clone())
            .map_err(|e| WorkflowError::new(e.to_string()))?;

        debug!(instance_id = %instance_id, generation, "workflow continued as new");
        Ok((workflow, generation))
    }

    fn finish_completed(&self, instance_id: &str, result: Value) {
        match self.inner.store.complete(instance_id, result.clone()) {
            Ok(()) => {
                self.record(instance_id, WorkflowEvent::WorkflowCompleted { result });
                info!(instance_id = %instance_id, "workflow instance completed");
            }
            Err(e) => debug!(instance_id = %instance_id, error = %e, "completion dropped"),
        }
    }

    fn finish_failed(&self, instance_id: &str, error: WorkflowError) {
        match self.inner.store.fail(instance_id, error.clone()) {
            Ok(()) => {
                warn!(instance_id = %instance_id, error = %error, "workflow instance failed");
                self.record(instance_id, WorkflowEvent::WorkflowFailed { error });
            }
            Err(e) => debug!(instance_id = %instance_id, error = %e, "failure dropped"),
        }
    }

    fn terminate_children(&self, children: &[String]) {
        for child in children {
            match self.terminate_instance(child, None) {
                Ok(()) | Err(ClientError::InvalidStatus(..)) | Err(ClientError::NotFound(_)) => {}
                Err(e) => warn!(child = %child, error = %e, "failed to terminate child workflow"),
            }
        }
    }

    fn terminate_instance(&self, instance_id: &str, output: Option<Value>) -> Result<(), ClientError> {
        self.inner.store.terminate(instance_id, output)?;
        self.record(
            instance_id,
            WorkflowEvent::WorkflowTerminated {
                reason: "terminated by client".to_string(),
            },
        );

        if let Some(token) = self.inner.running.lock().get(instance_id) {
            token.cancel();
        }
        info!(instance_id = %instance_id, "workflow instance terminated");
        Ok(())
    }

    fn record(&self, instance_id: &str, event: WorkflowEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.inner.store.record_event(instance_id, event) {
            warn!(instance_id = %instance_id, event_type, error = %e, "failed to record event");
        }
    }

    fn metadata(record: InstanceRecord) -> WorkflowMetadata {
        WorkflowMetadata {
            serialized_input: serde_json::to_string(&record.input).ok(),
            serialized_output: record
                .output
                .as_ref()
                .and_then(|output| serde_json::to_string(output).ok()),
            failure_details: record.failure.as_ref().map(FailureDetails::from),
            instance_id: record.instance_id,
            name: record.name,
            runtime_status: record.status,
            created_at: record.created_at,
            last_updated_at: record.last_updated_at,
        }
    }
}

#[async_trait]
impl WorkflowClient for WorkflowEngine {
    async fn schedule_new_workflow(
        &self,
        name: &str,
        options: ScheduleOptions,
    ) -> Result<String, ClientError> {
        let instance_id = options
            .instance_id
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        let input = options.input.unwrap_or(Value::Null);

        self.start_instance(&instance_id, name, input, None)?;
        Ok(instance_id)
    }

    async fn fetch_workflow_metadata(
        &self,
        instance_id: &str,
    ) -> Result<WorkflowMetadata, ClientError> {
        Ok(Self::metadata(self.inner.store.get(instance_id)?))
    }

    async fn wait_for_workflow_completion(
        &self,
        instance_id: &str,
        timeout: Duration,
    ) -> Result<WorkflowMetadata, ClientError> {
        let mut rx = self.inner.store.subscribe(instance_id)?;

        let waited = tokio::time::timeout(timeout, rx.wait_for(|status| status.is_terminal()))
            .await
            .map(|result| result.map(|status| *status));

        match waited {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => return Err(ClientError::NotFound(instance_id.to_string())),
            Err(_) => return Err(ClientError::Timeout(instance_id.to_string())),
        }

        self.fetch_workflow_metadata(instance_id).await
    }

    async fn terminate_workflow(
        &self,
        instance_id: &str,
        output: Option<Value>,
    ) -> Result<(), ClientError> {
        self.terminate_instance(instance_id, output)
    }

    async fn purge_workflow(&self, instance_id: &str) -> Result<(), ClientError> {
        Ok(self.inner.store.purge(instance_id)?)
    }
}
