//! Retry bookkeeping for provider calls.
//!
//! ```text
//! Attempting { attempt } --fail--> Backoff { attempt, delay } --wait--> Attempting { attempt + 1 }
//!            \--fail, no retries left--> Exhausted { attempts }
//! ```

use std::time::Duration;

use subrank_common::config::ScoringSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting { attempt: u32 },
    Backoff { attempt: u32, delay: Duration },
    Exhausted { attempts: u32 },
}

impl RetryPolicy {
    pub fn from_settings(settings: &ScoringSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_backoff: settings.base_backoff,
            max_backoff: settings.max_backoff,
        }
    }

    pub fn start(&self) -> RetryState {
        RetryState::Attempting { attempt: 0 }
    }

    /// `base * 2^attempt`, raised to the provider hint, never above the cap.
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let factor: u32 = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let exponential: Duration = self.base_backoff.saturating_mul(factor);
        exponential
            .max(hint.unwrap_or_default())
            .min(self.max_backoff)
    }

    /// Transition taken when the current attempt failed with a retryable error.
    pub fn on_failure(&self, state: RetryState, hint: Option<Duration>) -> RetryState {
        match state {
            RetryState::Attempting { attempt } if attempt < self.max_retries => RetryState::Backoff {
                attempt,
                delay: self.delay_for(attempt, hint),
            },
            RetryState::Attempting { attempt } => RetryState::Exhausted {
                attempts: attempt + 1,
            },
            other => other,
        }
    }

    /// Transition taken once the backoff delay has elapsed.
    pub fn on_backoff_elapsed(&self, state: RetryState) -> RetryState {
        match state {
            RetryState::Backoff { attempt, .. } => RetryState::Attempting {
                attempt: attempt + 1,
            },
            other => other,
        }
    }
}
