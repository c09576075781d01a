//! Activity timeout enforcement

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Timeout-related errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeoutError {
    /// Activity exceeded start-to-close timeout
    #[error("activity execution timed out (ran for {elapsed:?}, limit {limit:?})")]
    StartToCloseTimeout { elapsed: Duration, limit: Duration },
}

/// Run one activity attempt, bounded by its start-to-close timeout
///
/// A zero limit disables the bound.
pub async fn with_start_to_close_timeout<F, T>(limit: Duration, attempt: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    if limit.is_zero() {
        return Ok(attempt.await);
    }

    let started = Instant::now();
    tokio::time::timeout(limit, attempt)
        .await
        .map_err(|_| TimeoutError::StartToCloseTimeout {
            elapsed: started.elapsed(),
            limit,
        })
}
