//! Explicit retry/backoff policy shared by MCP tool invocation
//!
//! `spec.md` 4.1/4.9/9 asks for retry/backoff logic to be concentrated and
//! configured explicitly rather than scattered; this is the MCP-side half
//! (the LLM-side half lives in `orchestrator::llm::RetryPolicy`, which
//! mirrors this shape).

use std::time::Duration;

/// Which error kinds are worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableKind {
    Transport,
    Timeout,
}

/// Retry/backoff configuration for tool invocation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub retryable_kinds: Vec<RetryableKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            retryable_kinds: vec![RetryableKind::Transport, RetryableKind::Timeout],
        }
    }
}

impl RetryPolicy {
    /// Exponential delay for the given zero-indexed attempt, capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let scaled = self.base_delay.saturating_mul(multiplier);
        std::cmp::min(scaled, self.max_delay)
    }
}
