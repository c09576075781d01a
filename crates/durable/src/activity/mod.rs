//! Activity abstractions
//!
//! Activities are the side-effecting units of work a workflow schedules. They:
//! - Run outside the workflow state machine, possibly in parallel
//! - May fail and be retried according to the retry policy
//! - Are bounded by a start-to-close timeout per attempt

mod context;
mod definition;

pub use context::ActivityContext;
pub use definition::{Activity, ActivityError};
