//! Activity retry policy

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a failed activity is retried
///
/// The delay before retry `n` is `initial_interval * backoff_coefficient^(n-1)`,
/// capped at `max_interval`. Retrying stops when `max_attempts` is reached
/// or the next attempt would start after `retry_timeout`.
///
/// ```
/// use testapps_durable::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential()
///     .with_max_attempts(3)
///     .with_initial_interval(Duration::from_millis(100))
///     .with_max_interval(Duration::from_secs(1));
///
/// assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(100));
/// assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    #[serde(rename = "firstRetryIntervalMs", with = "duration_millis")]
    pub initial_interval: Duration,

    #[serde(rename = "maxRetryIntervalMs", with = "duration_millis")]
    pub max_interval: Duration,

    pub backoff_coefficient: f64,

    /// Give up once this much time has passed since the first attempt
    #[serde(
        default,
        rename = "retryTimeoutMs",
        skip_serializing_if = "Option::is_none",
        with = "option_duration_millis"
    )]
    pub retry_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential()
    }
}

impl RetryPolicy {
    /// 5 attempts, 1s first retry, doubling up to 60s
    pub fn exponential() -> Self {
        Self {
            max_attempts: 5,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(60),
            backoff_coefficient: 2.0,
            retry_timeout: None,
        }
    }

    /// A single attempt
    pub fn no_retry() -> Self {
        Self::fixed(Duration::ZERO, 1)
    }

    /// The same delay before every retry
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_interval: interval,
            max_interval: interval,
            backoff_coefficient: 1.0,
            retry_timeout: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    pub fn with_retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout = Some(timeout);
        self
    }

    /// Delay before `attempt` (1-based); zero for the first attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let retries = (attempt - 2) as i32;
        let delay = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(retries);
        // A negative or NaN coefficient from a deserialized policy falls back to the cap
        Duration::try_from_secs_f64(delay)
            .map(|delay| delay.min(self.max_interval))
            .unwrap_or(self.max_interval)
    }

    pub fn has_attempts_remaining(&self, current_attempt: u32) -> bool {
        current_attempt < self.max_attempts
    }

    /// Whether a retry after `next_delay` still starts within `retry_timeout`
    pub fn has_time_remaining(&self, elapsed: Duration, next_delay: Duration) -> bool {
        match self.retry_timeout {
            Some(timeout) => elapsed + next_delay < timeout,
            None => true,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod option_duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        duration
            .map(|d| d.as_millis() as u64)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
