//! Per-attempt scrape errors
//!
//! Every variant aborts the current attempt. Whether the retry controller
//! tries again is decided by `is_retryable` together with the retry budget.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("Timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Script evaluation failed: {message}")]
    Script { message: String },

    #[error("Anti-automation challenge detected (matched '{keyword}')")]
    ChallengeDetected { keyword: String },

    #[error("Unexpected chart payload: {reason}")]
    InvalidPayload { reason: String },

    #[error("Browser driver error: {0}")]
    Driver(String),
}

impl ScrapeError {
    pub fn timeout(what: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            waited,
        }
    }

    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }

    /// Page/runtime failures and challenge pages get another attempt; a
    /// challenge may be tied to the session and clear on its own. A broken
    /// driver connection does not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::Navigation { .. }
            | Self::Script { .. }
            | Self::ChallengeDetected { .. }
            | Self::InvalidPayload { .. } => true,
            Self::Driver(_) => false,
        }
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
