use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("insight request timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to connect to insight provider: {0}")]
    Connect(String),
    #[error("insight provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model not available on insight provider: {0}")]
    ModelNotFound(String),
    #[error("malformed insight response: {0}")]
    Malformed(String),
    #[error("insight request failed: {0}")]
    Request(String),
}

impl InsightError {
    pub fn from_status(status: StatusCode, body: impl Into<String>) -> Self {
        Self::Status {
            status: status.as_u16(),
            body: body.into(),
        }
    }

    /// Classify a transport error. `timeout` is the limit the request ran under.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connect(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::ModelNotFound(_) | Self::Malformed(_) | Self::Request(_) => false,
        }
    }
}
