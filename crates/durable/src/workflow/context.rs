//! Context handed to workflow callbacks

use chrono::{DateTime, Utc};

/// Read-only view of the running instance passed to every workflow callback
///
/// `current_time` is the timestamp of the event being processed, not the wall
/// clock, so decisions based on it stay deterministic for a given history.
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    instance_id: String,
    workflow_name: String,
    app_id: String,
    current_time: DateTime<Utc>,
    generation: u32,
}

impl WorkflowContext {
    /// Create a context for the first generation of an instance
    pub fn new(
        instance_id: impl Into<String>,
        workflow_name: impl Into<String>,
        app_id: impl Into<String>,
        current_time: DateTime<Utc>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            workflow_name: workflow_name.into(),
            app_id: app_id.into(),
            current_time,
            generation: 0,
        }
    }

    /// Set the continue-as-new generation
    pub fn with_generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    /// App id of the app executing this instance
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        self.current_time
    }

    /// Number of times this instance has continued as new
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub(crate) fn advance_to(&mut self, time: DateTime<Utc>) {
        // History timestamps never move backwards
        if time > self.current_time {
            self.current_time = time;
        }
    }
}
