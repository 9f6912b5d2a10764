//! Bounded status polling
//!
//! Lex builds and imports run asynchronously on the service side. After
//! starting one, the orchestrator polls the matching `Get*` operation until
//! the reported status leaves the in-progress set.
//!
//! Contract of [`wait_for_status`]:
//! - a status outside the in-progress set (failed or otherwise) ends the wait
//!   and the response is returned as-is; interpreting a failure is up to the
//!   caller;
//! - a failing status read is logged and consumes an attempt without any
//!   delay;
//! - when the attempts run out the last observed response is returned, even
//!   if it is still in progress. Running out is not an error;
//! - `None` means no status read succeeded at all. Callers that need a field
//!   of the response turn that into an error, the others carry on.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::errors::DeployerError;
use crate::services::Sleeper;
use crate::utils::{calc_exp_backoff, CooldownOptions};

/// Delay schedule between polls
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// `attempt * step`: 1s, 2s, 3s, ... with a one second step
    Linear { step: Duration },
    /// `base * multiplier^(attempt - 1)`, capped
    Exponential(CooldownOptions),
}

impl Backoff {
    /// Delay after the 1-based `attempt`
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Linear { step } => step.saturating_mul(attempt),
            Backoff::Exponential(options) => calc_exp_backoff(options, attempt.saturating_sub(1)),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Linear {
            step: Duration::from_secs(1),
        }
    }
}

/// How a reported status is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    InProgress,
    Failed,
    Settled,
}

/// Attempt bound, backoff and status classification for one wait
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    max_attempts: u32,
    backoff: Backoff,
    in_progress: Vec<String>,
    failed: Vec<String>,
}

impl PollPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

    /// Policy with the default bound (20 attempts) and linear backoff
    pub fn new<I, J>(in_progress: I, failed: J) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        J: IntoIterator,
        J::Item: Into<String>,
    {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::default(),
            in_progress: in_progress.into_iter().map(Into::into).collect(),
            failed: failed.into_iter().map(Into::into).collect(),
        }
    }

    /// At least one attempt is always made
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn classify(&self, status: &str) -> StatusClass {
        if self.in_progress.iter().any(|s| s == status) {
            StatusClass::InProgress
        } else if self.failed.iter().any(|s| s == status) {
            StatusClass::Failed
        } else {
            StatusClass::Settled
        }
    }
}

/// Poll `accessor` until the status read by `status_of` settles.
///
/// `label` names the status field in log lines only.
pub async fn wait_for_status<T, A, Fut, S>(
    policy: &PollPolicy,
    label: &str,
    sleeper: &dyn Sleeper,
    accessor: A,
    status_of: S,
) -> Option<T>
where
    A: Fn() -> Fut,
    Fut: Future<Output = Result<T, DeployerError>>,
    S: Fn(&T) -> &str,
{
    let max_attempts = policy.max_attempts;
    let mut last_response: Option<T> = None;

    for attempt in 1..=max_attempts {
        let response = match accessor().await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Reading {} failed (attempt {}/{}): {}",
                    label, attempt, max_attempts, e
                );
                continue;
            }
        };

        let status = status_of(&response);
        match policy.classify(status) {
            StatusClass::InProgress => {
                info!(
                    "Waiting for {} to exit from {} state (attempt {}/{})",
                    label, status, attempt, max_attempts
                );
                last_response = Some(response);
                if attempt < max_attempts {
                    sleeper.sleep(policy.backoff.delay(attempt)).await;
                }
            }
            StatusClass::Failed => {
                warn!("No need to wait, {} is {}", label, status);
                return Some(response);
            }
            StatusClass::Settled => {
                info!("Exiting with {} in {} state", label, status);
                return Some(response);
            }
        }
    }

    match &last_response {
        Some(_) => warn!(
            "Gave up waiting for {} after {} attempts",
            label, max_attempts
        ),
        None => warn!(
            "Gave up waiting for {}: no status could be read in {} attempts",
            label, max_attempts
        ),
    }

    last_response
}
