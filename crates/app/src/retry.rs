//! Retry budget for control-API calls.
//!
//! A call starts in [`RetryState::Attempting`] with the full budget. Each
//! classified failure either moves it to [`RetryState::Retry`] (one fewer
//! attempt left) or, once the budget is spent, to [`RetryState::Exhausted`].
//! A success ends the call outright, so it needs no state of its own.

use std::time::Duration;

use yolink_bridge_domain::code::ErrorCode;

/// How many times a failed call is retried, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub retries: u32,
    /// Fixed wait before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Total number of sends a call may make.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Initial state of a call governed by this policy.
    #[must_use]
    pub fn start(&self) -> RetryState {
        RetryState::Attempting {
            remaining: self.retries,
        }
    }

    /// Number of attempts made once a call reaches `state`.
    #[must_use]
    pub fn attempts_made(&self, state: &RetryState) -> u32 {
        match state {
            RetryState::Attempting { remaining } => self.retries - remaining + 1,
            RetryState::Retry { remaining, .. } => self.retries - remaining,
            RetryState::Exhausted { .. } => self.max_attempts(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay: Duration::from_secs(10),
        }
    }
}

/// Where a single call stands in its retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    /// About to send; `remaining` retries are left after this attempt.
    Attempting { remaining: u32 },
    /// The last attempt failed with `code`; a retry is still allowed.
    Retry { remaining: u32, code: ErrorCode },
    /// The last attempt failed with `code` and no retries are left.
    Exhausted { code: ErrorCode },
}

impl RetryState {
    /// Transition after an attempt failed with `code`.
    #[must_use]
    pub fn on_failure(self, code: ErrorCode) -> Self {
        match self {
            Self::Attempting { remaining: 0 } => Self::Exhausted { code },
            Self::Attempting { remaining } => Self::Retry {
                remaining: remaining - 1,
                code,
            },
            other => other,
        }
    }

    /// Transition from a pending retry back to sending.
    #[must_use]
    pub fn resume(self) -> Self {
        match self {
            Self::Retry { remaining, .. } => Self::Attempting { remaining },
            other => other,
        }
    }
}
