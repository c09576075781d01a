//! Workflow definitions of the workflow apps
//!
//! Each submodule holds the workflows of one app and a `registry()` with
//! everything that app needs to run them locally, including definitions
//! that other apps own in a multi-app deployment.

pub mod basic;
pub mod crossapp;
pub mod full;
pub mod multiapp;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use testapps_durable::{
    Activity, ActivityContext, ActivityError, WorkflowError, WorkflowRegistry,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend;
use crate::config::AppConfig;
use crate::http::{self, WorkflowState};

/// Serve a workflow app whose `/start` runs `workflow_name`
pub async fn serve_app(
    config: &AppConfig,
    workflow_name: &str,
    registry: WorkflowRegistry,
    shutdown: CancellationToken,
) -> Result<()> {
    info!(
        port = config.port,
        app_id = %config.app_id,
        backend = %config.workflow_backend,
        workflow = workflow_name,
        "Starting workflow app"
    );

    let client = backend::workflow_client(config, registry)?;
    let state = WorkflowState::new(client, workflow_name, config.workflow_timeout);
    http::serve(http::workflow_app(state), config.port, shutdown).await
}

/// Exclusive upper bound of the random numbers the activities return
pub const RANDOM_NUMBER_LIMIT: u32 = 100_000;

fn random_number() -> u32 {
    rand::thread_rng().gen_range(0..RANDOM_NUMBER_LIMIT)
}

/// Read an integer activity or child workflow result
pub(crate) fn expect_number(result: &Value) -> Result<i64, WorkflowError> {
    result
        .as_i64()
        .ok_or_else(|| WorkflowError::new(format!("expected a number, got {result}")))
}

/// Returns a random number below [`RANDOM_NUMBER_LIMIT`]
pub struct TestActivity;

#[async_trait]
impl Activity for TestActivity {
    const TYPE: &'static str = "TestActivity";
    type Input = ();
    type Output = u32;

    async fn execute(&self, ctx: &ActivityContext, _input: ()) -> Result<u32, ActivityError> {
        let number = random_number();
        debug!(instance_id = %ctx.instance_id, number, "TestActivity called");
        Ok(number)
    }
}

/// Same as [`TestActivity`] under the name cross-app callers use
pub struct RandomNumberGenerator;

#[async_trait]
impl Activity for RandomNumberGenerator {
    const TYPE: &'static str = "random_number_generator";
    type Input = ();
    type Output = u32;

    async fn execute(&self, ctx: &ActivityContext, _input: ()) -> Result<u32, ActivityError> {
        let number = random_number();
        debug!(
            instance_id = %ctx.instance_id,
            attempt = ctx.attempt,
            number,
            "Random number activity completed"
        );
        Ok(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_random_numbers_in_range() {
        let ctx = ActivityContext::new("wf", "a", 1, 1);
        for _ in 0..100 {
            assert!(TestActivity.execute(&ctx, ()).await.unwrap() < RANDOM_NUMBER_LIMIT);
            assert!(RandomNumberGenerator.execute(&ctx, ()).await.unwrap() < RANDOM_NUMBER_LIMIT);
        }
    }

    #[test]
    fn test_expect_number() {
        assert_eq!(expect_number(&json!(42)).unwrap(), 42);
        assert!(expect_number(&json!("42")).is_err());
    }
}
