//! Activities and their errors

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::ActivityContext;

/// Failure reported by an activity
///
/// `retryable: false` fails the activity even when its retry policy has
/// attempts left.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityError {
    pub message: String,

    /// Machine readable code, surfaced as the workflow failure's error type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,

    pub retryable: bool,
}

impl ActivityError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            retryable: false,
        }
    }

    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }
}

impl std::fmt::Display for ActivityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActivityError {}

impl From<anyhow::Error> for ActivityError {
    fn from(err: anyhow::Error) -> Self {
        Self::retryable(err.to_string())
    }
}

/// Side-effecting work a workflow schedules
///
/// Activities run outside the workflow state machine, may be retried and
/// may read clocks or random numbers.
///
/// # Example
///
/// ```ignore
/// struct DoubleActivity;
///
/// #[async_trait]
/// impl Activity for DoubleActivity {
///     const TYPE: &'static str = "DoubleActivity";
///     type Input = i64;
///     type Output = i64;
///
///     async fn execute(&self, _ctx: &ActivityContext, n: i64) -> Result<i64, ActivityError> {
///         Ok(n * 2)
///     }
/// }
/// ```
#[async_trait]
pub trait Activity: Send + Sync + 'static {
    /// Name the activity is registered and scheduled under
    const TYPE: &'static str;

    type Input: Serialize + DeserializeOwned + Send;
    type Output: Serialize + DeserializeOwned + Send;

    /// Run one attempt
    ///
    /// Return [`ActivityError::non_retryable`] for failures a retry cannot fix.
    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError>;
}
