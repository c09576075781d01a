use std::time::Duration;

use thiserror::Error;

/// Errors from sidecar calls
#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("sidecar request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sidecar returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode sidecar response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, String),
}

impl SidecarError {
    /// HTTP status returned by the sidecar, if the request got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
