//! Bounded retry with linear backoff
//!
//! A [`Retrier`] runs one network operation up to `max_attempts` times. An
//! attempt fails when the operation errors or when the acceptance predicate
//! rejects its result. After failed attempt `n` the retrier suspends for
//! `n * base_delay` before trying again; the final failed attempt is not
//! followed by a delay.
//!
//! Progress is tracked by [`AttemptState`]:
//!
//! ```text
//! Pending(n) -> Attempting(n) -> Succeeded
//!                             -> Waiting(n, delay) -> Pending(n + 1)
//!                             -> Exhausted
//! ```

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::{RegistryError, Result};

/// Attempt budget and backoff unit for one kind of request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Backoff unit; the delay after attempt `n` is `n * base_delay`
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based)
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Where a retryable operation currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Ready to run attempt `attempt`
    Pending { attempt: u32 },
    /// Attempt `attempt` is in flight
    Attempting { attempt: u32 },
    /// Attempt `attempt` failed; waiting `delay` before the next one
    Waiting { attempt: u32, delay: Duration },
    /// An attempt was accepted
    Succeeded { attempts: u32 },
    /// Every attempt failed
    Exhausted { attempts: u32 },
}

impl Default for AttemptState {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptState {
    pub fn new() -> Self {
        AttemptState::Pending { attempt: 1 }
    }

    /// Current or last attempt number
    pub fn attempt(&self) -> u32 {
        match *self {
            AttemptState::Pending { attempt }
            | AttemptState::Attempting { attempt }
            | AttemptState::Waiting { attempt, .. } => attempt,
            AttemptState::Succeeded { attempts } | AttemptState::Exhausted { attempts } => {
                attempts
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Succeeded { .. } | AttemptState::Exhausted { .. }
        )
    }

    /// `Pending -> Attempting`
    #[must_use]
    pub fn begin(self) -> Self {
        match self {
            AttemptState::Pending { attempt } => AttemptState::Attempting { attempt },
            other => other,
        }
    }

    /// `Attempting -> Succeeded`
    #[must_use]
    pub fn succeed(self) -> Self {
        match self {
            AttemptState::Attempting { attempt } => AttemptState::Succeeded { attempts: attempt },
            other => other,
        }
    }

    /// `Attempting -> Waiting | Exhausted`
    #[must_use]
    pub fn fail(self, policy: &RetryPolicy) -> Self {
        match self {
            AttemptState::Attempting { attempt } if attempt >= policy.max_attempts => {
                AttemptState::Exhausted { attempts: attempt }
            }
            AttemptState::Attempting { attempt } => AttemptState::Waiting {
                attempt,
                delay: policy.delay_after(attempt),
            },
            other => other,
        }
    }

    /// `Waiting -> Pending` for the next attempt
    #[must_use]
    pub fn resume(self) -> Self {
        match self {
            AttemptState::Waiting { attempt, .. } => AttemptState::Pending {
                attempt: attempt + 1,
            },
            other => other,
        }
    }
}

/// Terminal failure of a retried operation
///
/// Carries the most recent result the predicate rejected, if any. It is not
/// valid data; callers that choose to salvage it must say so.
#[derive(Debug)]
pub struct Exhausted<T> {
    /// Identifies the operation (page offset, package name)
    pub key: String,
    /// Attempts made
    pub attempts: u32,
    /// Most recent result rejected by the predicate
    pub last_rejected: Option<T>,
    /// Most recent operation error
    pub last_error: Option<String>,
}

impl<T> Exhausted<T> {
    pub fn into_error(self) -> RegistryError {
        let last_error = match (self.last_error, self.last_rejected.is_some()) {
            (Some(error), _) => error,
            (None, true) => "result rejected".to_string(),
            (None, false) => "no attempt made".to_string(),
        };

        RegistryError::ExhaustedRetries {
            key: self.key,
            attempts: self.attempts,
            last_error,
        }
    }
}

/// Runs operations under a [`RetryPolicy`]
#[derive(Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl Retrier {
    pub fn new(policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { policy, clock }
    }

    /// Run `op` until `accept` approves a result or attempts run out
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut, P>(
        &self,
        key: &str,
        mut op: F,
        accept: P,
    ) -> std::result::Result<T, Exhausted<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&T) -> bool,
    {
        let max_attempts = self.policy.max_attempts;
        let mut state = AttemptState::new();
        let mut last_rejected = None;
        let mut last_error = None;

        loop {
            state = match state {
                AttemptState::Pending { .. } => state.begin(),
                AttemptState::Attempting { attempt } => {
                    tracing::debug!(key, attempt, max_attempts, "attempting");

                    match op(attempt).await {
                        Ok(value) if accept(&value) => {
                            let state = state.succeed();
                            tracing::debug!(key, attempts = state.attempt(), "succeeded");
                            return Ok(value);
                        }
                        Ok(value) => {
                            tracing::debug!(key, attempt, max_attempts, "result rejected");
                            last_rejected = Some(value);
                        }
                        Err(e) => {
                            tracing::debug!(key, attempt, max_attempts, error = %e, "attempt failed");
                            last_error = Some(e.to_string());
                        }
                    }

                    state.fail(&self.policy)
                }
                AttemptState::Waiting { delay, .. } => {
                    self.clock.sleep(delay).await;
                    state.resume()
                }
                AttemptState::Succeeded { .. } | AttemptState::Exhausted { .. } => break,
            };
        }

        tracing::debug!(key, attempts = state.attempt(), "retries exhausted");

        Err(Exhausted {
            key: key.to_string(),
            attempts: state.attempt(),
            last_rejected,
            last_error,
        })
    }

    /// Like [`Retrier::run`], accepting every successful result and mapping
    /// exhaustion to [`RegistryError::ExhaustedRetries`]
    pub async fn run_checked<T, F, Fut>(&self, key: &str, op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(key, op, |_| true)
            .await
            .map_err(Exhausted::into_error)
    }
}
