//! Error types for feed operations.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching market data.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API key missing or rejected")]
    Unauthorized,
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Parse(err.to_string())
    }
}

impl FeedError {
    /// Returns true if this error is transient and likely to succeed on the
    /// next poll cycle.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FeedError::Http(_)
                | FeedError::Status(_)
                | FeedError::Upstream(_)
                | FeedError::RateLimitExceeded
        )
    }

    /// Suggested delay before retrying, if the error should be retried at all.
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            FeedError::RateLimitExceeded => Some(Duration::from_secs(60)),
            FeedError::Http(_) | FeedError::Status(_) | FeedError::Upstream(_) => {
                Some(Duration::from_secs(5))
            }
            FeedError::Parse(_) | FeedError::Unauthorized => None,
        }
    }
}
