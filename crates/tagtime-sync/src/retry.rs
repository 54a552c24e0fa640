// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry ceiling and delay computation for failed reconciliations.

use std::time::Duration;

use tagtime_config::model::{BackoffKind, SyncConfig};

/// What to do after a reconciliation attempt that left work undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run again after `delay` with `retry_count` attempts behind it.
    Retry { delay: Duration, retry_count: u32 },
    /// The ceiling is reached; the user has to re-edit the sample.
    GiveUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff: BackoffKind,
    pub max_delay: Duration,
    pub not_found_after: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_secs(config.retry_delay_secs),
            backoff: config.backoff,
            max_delay: Duration::from_secs(config.max_retry_delay_secs),
            not_found_after: config.not_found_after_retries,
        }
    }

    /// Decision for an attempt that ran with `retry_count` retries behind it.
    pub fn decide(&self, retry_count: u32) -> RetryDecision {
        if retry_count >= self.max_retries {
            return RetryDecision::GiveUp;
        }
        let next = retry_count + 1;
        RetryDecision::Retry {
            delay: self.delay_for(next),
            retry_count: next,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            BackoffKind::Fixed => self.base_delay,
            BackoffKind::Exponential => {
                let factor = 1u32
                    .checked_shl(retry.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                self.base_delay
                    .checked_mul(factor)
                    .map_or(self.max_delay, |d| d.min(self.max_delay))
            }
        }
    }

    /// Whether a `NotFound` answer to a delete on this attempt means the point
    /// is already gone. Always true on the final attempt.
    pub fn not_found_resolves(&self, retry_count: u32) -> bool {
        retry_count >= self.not_found_after.min(self.max_retries)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_retries_five_times_then_gives_up() {
        let policy = RetryPolicy::default();
        for count in 0..5 {
            assert_eq!(
                policy.decide(count),
                RetryDecision::Retry {
                    delay: Duration::from_secs(60),
                    retry_count: count + 1,
                }
            );
        }
        assert_eq!(policy.decide(5), RetryDecision::GiveUp);
        assert_eq!(policy.decide(9), RetryDecision::GiveUp);
    }

    #[test]
    fn exponential_policy_doubles_and_caps() {
        let policy = RetryPolicy {
            backoff: BackoffKind::Exponential,
            max_delay: Duration::from_secs(300),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(60));
        assert_eq!(policy.delay_for(2), Duration::from_secs(120));
        assert_eq!(policy.delay_for(3), Duration::from_secs(240));
        assert_eq!(policy.delay_for(4), Duration::from_secs(300));
        assert_eq!(policy.delay_for(40), Duration::from_secs(300));
    }

    #[test]
    fn not_found_resolves_from_first_retry() {
        let policy = RetryPolicy::default();
        assert!(!policy.not_found_resolves(0));
        assert!(policy.not_found_resolves(1));
        assert!(policy.not_found_resolves(5));
    }

    #[test]
    fn not_found_threshold_never_exceeds_ceiling() {
        let policy = RetryPolicy {
            max_retries: 2,
            not_found_after: 10,
            ..RetryPolicy::default()
        };
        assert!(!policy.not_found_resolves(1));
        assert!(policy.not_found_resolves(2));
    }
}
