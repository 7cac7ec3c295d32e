//! Retry policy for catalog requests
//!
//! Transport failures, 5xx and 429 are retried with exponential backoff;
//! 429 honors a `Retry-After` hint when the server sends one. Every other
//! status is terminal.

use std::time::Duration;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry with exponential backoff
    Backoff,
    /// Retry after an explicit delay
    After(Duration),
    /// Do not retry
    Terminal,
}

impl RetryDecision {
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::Terminal)
    }
}

/// Bounded exponential backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry (milliseconds)
    pub base_backoff_ms: u64,
    /// Upper bound on any single delay (milliseconds)
    pub max_backoff_ms: u64,
    /// Total attempts including the first one
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_base_backoff_ms(mut self, ms: u64) -> Self {
        self.base_backoff_ms = ms;
        self
    }

    pub const fn with_max_backoff_ms(mut self, ms: u64) -> Self {
        self.max_backoff_ms = ms;
        self
    }

    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// `base * 2^attempt`, capped at `max_backoff_ms`
    pub fn compute_backoff_ms(&self, attempt: u32) -> u64 {
        let exp = attempt.min(30);
        self.base_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms)
    }

    /// Delay before retrying after failed attempt number `attempt` (0-indexed),
    /// or `None` when the decision is terminal or attempts are exhausted
    pub fn next_delay(&self, attempt: u32, decision: RetryDecision) -> Option<Duration> {
        if attempt.saturating_add(1) >= self.max_attempts {
            return None;
        }
        match decision {
            RetryDecision::Terminal => None,
            RetryDecision::After(delay) => Some(delay.min(Duration::from_millis(self.max_backoff_ms))),
            RetryDecision::Backoff => Some(Duration::from_millis(self.compute_backoff_ms(attempt))),
        }
    }
}

/// Classify an HTTP status into a retry decision
pub fn decision_from_http_status(status: u16, retry_after: Option<Duration>) -> RetryDecision {
    match status {
        429 => retry_after.map_or(RetryDecision::Backoff, RetryDecision::After),
        500..=599 => RetryDecision::Backoff,
        _ => RetryDecision::Terminal,
    }
}

/// Parse a `Retry-After` header given in delta-seconds
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new().with_base_backoff_ms(100).with_max_backoff_ms(350);
        assert_eq!(policy.compute_backoff_ms(0), 100);
        assert_eq!(policy.compute_backoff_ms(1), 200);
        assert_eq!(policy.compute_backoff_ms(2), 350);
    }

    #[test]
    fn test_attempts_are_bounded() {
        let policy = RetryPolicy::new().with_max_attempts(3);
        assert!(policy.next_delay(0, RetryDecision::Backoff).is_some());
        assert!(policy.next_delay(1, RetryDecision::Backoff).is_some());
        assert!(policy.next_delay(2, RetryDecision::Backoff).is_none());
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(decision_from_http_status(503, None), RetryDecision::Backoff);
        assert_eq!(decision_from_http_status(404, None), RetryDecision::Terminal);
        assert_eq!(decision_from_http_status(408, None), RetryDecision::Terminal);
        assert_eq!(
            decision_from_http_status(429, Some(Duration::from_secs(2))),
            RetryDecision::After(Duration::from_secs(2))
        );
        assert_eq!(decision_from_http_status(429, None), RetryDecision::Backoff);
    }

    #[test]
    fn test_terminal_never_delays() {
        assert!(RetryPolicy::new().next_delay(0, RetryDecision::Terminal).is_none());
        assert!(!RetryDecision::Terminal.is_retryable());
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after(" 3 "), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
