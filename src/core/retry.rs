//! Bounded-attempt retry with a fixed delay between attempts

use crate::core::fetch::FetchFailure;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay between listing attempts. Independent of the user retry delay.
pub const LISTING_RETRY_DELAY: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// A policy always allows at least one attempt.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn listing(max_attempts: u32) -> Self {
        Self::new(max_attempts, LISTING_RETRY_DELAY)
    }

    pub fn detail(max_attempts: u32, retry_delay: Duration) -> Self {
        Self::new(max_attempts, retry_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Attempting(u32),
    Retrying(u32),
    Succeeded(u32),
    GivenUp(u32),
}

/// Returned once the attempt budget is spent; carries the last failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GivenUp {
    pub attempts: u32,
    pub last: FetchFailure,
}

/// Drives one logical request (the listing download, or one bulk detail
/// cycle) through its attempts.
#[derive(Debug)]
pub struct RetryController {
    label: &'static str,
    policy: RetryPolicy,
    state: RetryState,
}

impl RetryController {
    pub fn new(label: &'static str, policy: RetryPolicy) -> Self {
        Self {
            label,
            policy,
            state: RetryState::Idle,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs `operation` until it succeeds or `max_attempts` attempts failed.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn run<F, Fut, T>(&mut self, mut operation: F) -> Result<T, GivenUp>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchFailure>>,
    {
        let mut attempt = 1;
        loop {
            self.state = RetryState::Attempting(attempt);
            match operation(attempt).await {
                Ok(value) => {
                    self.state = RetryState::Succeeded(attempt);
                    return Ok(value);
                }
                Err(err) => {
                    if attempt >= self.policy.max_attempts {
                        warn!(
                            request = self.label,
                            attempts = attempt,
                            error = %err,
                            "Giving up"
                        );
                        self.state = RetryState::GivenUp(attempt);
                        return Err(GivenUp {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    debug!(
                        "{} attempt {}/{} failed: {}. Retrying in {:?}...",
                        self.label, attempt, self.policy.max_attempts, err, self.policy.delay
                    );
                    self.state = RetryState::Retrying(attempt);
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> FetchFailure {
        FetchFailure::new(Some(500), "HTTP error: 500 Internal Server Error")
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let mut controller = RetryController::new("listing", RetryPolicy::listing(4));
        let mut attempts = Vec::new();

        let result: Result<(), GivenUp> = controller
            .run(|attempt| {
                attempts.push(attempt);
                async { Err(failure()) }
            })
            .await;

        let given_up = result.unwrap_err();
        assert_eq!(given_up.attempts, 4);
        assert_eq!(given_up.last, failure());
        assert_eq!(attempts, vec![1, 2, 3, 4]);
        assert_eq!(controller.state(), RetryState::GivenUp(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_retry() {
        let mut controller =
            RetryController::new("detail", RetryPolicy::detail(2, Duration::from_secs(5)));
        let mut calls = 0;

        let result = controller
            .run(|attempt| {
                calls += 1;
                async move {
                    if attempt < 2 {
                        Err(failure())
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls, 2);
        assert_eq!(controller.state(), RetryState::Succeeded(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_fixed_delay_between_attempts() {
        let mut controller = RetryController::new("listing", RetryPolicy::listing(3));
        let started = tokio::time::Instant::now();

        let _ = controller
            .run(|_| async { Err::<(), _>(failure()) })
            .await;

        // Two gaps between three attempts, no delay after the last one.
        assert_eq!(started.elapsed(), LISTING_RETRY_DELAY * 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_is_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);

        let mut controller = RetryController::new("detail", policy);
        assert_eq!(controller.state(), RetryState::Idle);
        let mut calls = 0;
        let result: Result<(), GivenUp> = controller
            .run(|_| {
                calls += 1;
                async { Err(failure()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
