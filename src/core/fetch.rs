//! Single-attempt JSON fetching abstractions

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Display;

/// Outcome of one outbound GET request.
///
/// Every failure mode (transport error, non-200 status, unparsable body) is
/// folded into [`FetchOutcome::Failure`] so that callers never see a raw error.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success { status: u16, body: Value },
    Failure { status: Option<u16>, error: String },
}

impl FetchOutcome {
    pub fn failure(status: Option<u16>, error: impl Display) -> Self {
        FetchOutcome::Failure {
            status,
            error: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    /// Converts the outcome into `(status, body)` on success.
    pub fn into_result(self) -> Result<(u16, Value), FetchFailure> {
        match self {
            FetchOutcome::Success { status, body } => Ok((status, body)),
            FetchOutcome::Failure { status, error } => Err(FetchFailure { status, error }),
        }
    }
}

/// A failed fetch attempt, kept for diagnostics once retries run out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub status: Option<u16>,
    pub error: String,
}

impl FetchFailure {
    pub fn new(status: Option<u16>, error: impl Display) -> Self {
        Self {
            status,
            error: error.to_string(),
        }
    }
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {})", self.error, status),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for FetchFailure {}

#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch(&self, url: &str, api_key: Option<&str>) -> FetchOutcome;
}
