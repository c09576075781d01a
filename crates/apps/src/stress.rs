//! Workflow stress loop
//!
//! A fixed pool of workers keeps scheduling `TestWorkflow` and waiting for
//! it, with a semaphore capping the runs in flight. Completed runs are
//! counted and the throughput is logged once per interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use testapps_durable::{ClientError, RuntimeStatus, ScheduleOptions, WorkflowClient, Workflow};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::http::timestamp_now;
use crate::workflows::basic::TestWorkflow;

/// Number of completed workflow runs
#[derive(Debug, Default)]
pub struct CompletionCounter(AtomicU64);

impl CompletionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Worker tasks competing for run slots
    pub workers: usize,

    /// Maximum workflow runs in flight
    pub concurrent_runs: usize,

    /// Bound on waiting for one run
    pub workflow_timeout: Duration,

    pub report_interval: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            workers: 200,
            concurrent_runs: 100,
            workflow_timeout: Duration::from_secs(30),
            report_interval: Duration::from_secs(1),
        }
    }
}

impl StressConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `STRESS_WORKERS`: worker tasks (default: 200)
    /// - `STRESS_CONCURRENT_RUNS`: runs in flight (default: 100)
    /// - `WORKFLOW_TIMEOUT_SECS`: wait bound per run (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            workers: parse("STRESS_WORKERS").unwrap_or(defaults.workers),
            concurrent_runs: parse("STRESS_CONCURRENT_RUNS")
                .unwrap_or(defaults.concurrent_runs)
                .max(1),
            workflow_timeout: parse("WORKFLOW_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.workflow_timeout),
            report_interval: defaults.report_interval,
        }
    }
}

fn parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("workflow {instance_id} failed! Status: {status}")]
    NotCompleted {
        instance_id: String,
        status: RuntimeStatus,
    },
}

/// Schedule one `TestWorkflow` run, wait for it to complete and purge it
pub async fn run_workflow(
    client: &dyn WorkflowClient,
    timeout: Duration,
) -> Result<String, RunError> {
    let options = ScheduleOptions::new().with_input(&timestamp_now())?;
    let instance_id = client
        .schedule_new_workflow(TestWorkflow::TYPE, options)
        .await?;

    let metadata = client
        .wait_for_workflow_completion(&instance_id, timeout)
        .await?;

    // Finished runs are not kept; the loop never ends
    if let Err(e) = client.purge_workflow(&instance_id).await {
        warn!(instance_id = %instance_id, error = %e, "Failed to purge workflow");
    }

    if metadata.runtime_status != RuntimeStatus::Completed {
        return Err(RunError::NotCompleted {
            instance_id,
            status: metadata.runtime_status,
        });
    }
    Ok(instance_id)
}

async fn worker(
    client: Arc<dyn WorkflowClient>,
    slots: Arc<Semaphore>,
    counter: Arc<CompletionCounter>,
    timeout: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let permit = tokio::select! {
            _ = shutdown.cancelled() => return,
            permit = slots.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
        };

        match run_workflow(client.as_ref(), timeout).await {
            Ok(_) => {
                counter.increment();
            }
            Err(e) => error!(error = %e, "Error running workflow"),
        }
        drop(permit);
    }
}

async fn report(counter: Arc<CompletionCounter>, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    let mut previous = counter.get();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {
                let current = counter.get();
                info!(
                    completed = current,
                    per_interval = current - previous,
                    "Workflows completed: {} (about {}/s)",
                    current,
                    current - previous
                );
                previous = current;
            }
        }
    }
}

/// Run workers until `shutdown` is cancelled
///
/// Runs in flight when the token is cancelled are finished before this
/// returns.
pub async fn run(
    client: Arc<dyn WorkflowClient>,
    config: StressConfig,
    counter: Arc<CompletionCounter>,
    shutdown: CancellationToken,
) {
    info!(
        workers = config.workers,
        concurrent_runs = config.concurrent_runs,
        "Starting continuous workflow execution"
    );

    let slots = Arc::new(Semaphore::new(config.concurrent_runs));
    let mut tasks = JoinSet::new();
    for _ in 0..config.workers {
        tasks.spawn(worker(
            client.clone(),
            slots.clone(),
            counter.clone(),
            config.workflow_timeout,
            shutdown.clone(),
        ));
    }
    tasks.spawn(report(
        counter.clone(),
        config.report_interval,
        shutdown.clone(),
    ));

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "Stress task panicked");
        }
    }

    info!(completed = counter.get(), "Stress run stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::basic;
    use testapps_durable::{EngineConfig, WorkflowEngine};

    #[test]
    fn test_counter() {
        let counter = CompletionCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.get(), 2);
    }

    #[tokio::test]
    async fn test_run_workflow_completes() {
        let engine = WorkflowEngine::new(EngineConfig::new("stress"), basic::registry());
        let id = run_workflow(&engine, Duration::from_secs(5)).await.unwrap();
        assert!(!id.is_empty());
    }

    #[tokio::test]
    async fn test_run_workflow_reports_unknown_workflow() {
        let engine = WorkflowEngine::new(
            EngineConfig::new("stress"),
            testapps_durable::WorkflowRegistry::new(),
        );
        let err = run_workflow(&engine, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, RunError::Client(ClientError::Registry(_))));
    }

    #[tokio::test]
    async fn test_stress_run_counts_completions_and_stops() {
        let engine: Arc<dyn WorkflowClient> = Arc::new(WorkflowEngine::new(
            EngineConfig::new("stress"),
            basic::registry(),
        ));
        let counter = Arc::new(CompletionCounter::new());
        let token = CancellationToken::new();
        let config = StressConfig {
            workers: 4,
            concurrent_runs: 2,
            workflow_timeout: Duration::from_secs(5),
            report_interval: Duration::from_millis(50),
        };

        let handle = tokio::spawn(run(engine, config, counter.clone(), token.clone()));
        while counter.get() < 10 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(counter.get() >= 10);
    }

    #[tokio::test]
    async fn test_run_workflow_purges_finished_instance() {
        let engine = WorkflowEngine::new(EngineConfig::new("stress"), basic::registry());
        let id = run_workflow(&engine, Duration::from_secs(5)).await.unwrap();

        assert_eq!(engine.store().instance_count(), 0);
        assert!(matches!(
            engine.fetch_workflow_metadata(&id).await,
            Err(ClientError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stress_run_keeps_store_bounded() {
        let engine = Arc::new(WorkflowEngine::new(
            EngineConfig::new("stress"),
            basic::registry(),
        ));
        let counter = Arc::new(CompletionCounter::new());
        let token = CancellationToken::new();
        let config = StressConfig {
            workers: 8,
            concurrent_runs: 4,
            workflow_timeout: Duration::from_secs(5),
            report_interval: Duration::from_millis(50),
        };

        let client: Arc<dyn WorkflowClient> = engine.clone();
        let handle = tokio::spawn(run(client, config, counter.clone(), token.clone()));
        while counter.get() < 200 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        // Only runs in flight at cancellation may remain
        assert!(engine.store().instance_count() <= 4);
    }
}
