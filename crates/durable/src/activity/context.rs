//! Activity execution context

use uuid::Uuid;

/// Context provided to activities during execution
///
/// Describes the current attempt. A fresh context is built for every retry,
/// with a new `task_execution_id`.
#[derive(Debug, Clone)]
pub struct ActivityContext {
    /// Unique id of this execution attempt
    pub task_execution_id: Uuid,

    /// Workflow instance that scheduled the activity
    pub instance_id: String,

    /// Activity ID within the workflow
    pub activity_id: String,

    /// Current attempt number (1-based)
    pub attempt: u32,

    /// Maximum attempts allowed
    pub max_attempts: u32,
}

impl ActivityContext {
    /// Create a new activity context
    pub fn new(
        instance_id: impl Into<String>,
        activity_id: impl Into<String>,
        attempt: u32,
        max_attempts: u32,
    ) -> Self {
        Self {
            task_execution_id: Uuid::now_v7(),
            instance_id: instance_id.into(),
            activity_id: activity_id.into(),
            attempt,
            max_attempts,
        }
    }

    /// Check if this is the last retry attempt
    pub fn is_last_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}
