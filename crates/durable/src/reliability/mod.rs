//! Reliability primitives for activity execution
//!
//! - [`RetryPolicy`]: backoff between activity attempts
//! - [`with_start_to_close_timeout`]: per-attempt execution bound

mod retry;
mod timeout;

pub use retry::RetryPolicy;
pub use timeout::{with_start_to_close_timeout, TimeoutError};
