use std::time::Duration;

use crate::config::RetryPolicy;

/// Exponential backoff state for one run of consecutive retries.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
	policy: RetryPolicy,
	attempt: u32,
}

impl Backoff {
	pub fn new(policy: RetryPolicy) -> Self {
		Self { policy, attempt: 0 }
	}

	/// Retries consumed since the last reset.
	pub const fn attempt(&self) -> u32 {
		self.attempt
	}

	/// Delay before the next retry, or `None` once the policy is exhausted.
	pub fn next_delay(&mut self) -> Option<Duration> {
		if self.attempt >= self.policy.max_attempts {
			return None;
		}
		let factor = 1u64.checked_shl(self.attempt).unwrap_or(u64::MAX);
		let delay = self
			.policy
			.initial_backoff_ms
			.saturating_mul(factor)
			.min(self.policy.max_backoff_ms);
		self.attempt += 1;
		Some(Duration::from_millis(delay))
	}

	/// Starts a fresh run, e.g. after a successful connection.
	pub fn reset(&mut self) {
		self.attempt = 0;
	}
}
