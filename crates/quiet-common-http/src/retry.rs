// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded retry for outbound sends.
//!
//! Every error is treated as transient: the loop stops on the first success or
//! after `max_attempts` calls. The delay between attempts is `base_delay`
//! multiplied by `backoff_factor` per retry, capped at `max_delay`. The default
//! policy retries immediately.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::ZERO,
			max_delay: Duration::from_secs(30),
			backoff_factor: 1.0,
			jitter: false,
		}
	}
}

impl RetryPolicy {
	/// Fixed delay between attempts, no growth, no jitter.
	pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
		Self {
			max_attempts,
			base_delay: delay,
			..Self::default()
		}
	}

	/// Delay before retry number `retry` (1-based).
	pub fn delay_for(&self, retry: u32) -> Duration {
		if self.base_delay.is_zero() {
			return Duration::ZERO;
		}
		let exponent = retry.saturating_sub(1) as i32;
		let raw = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
		let capped = raw.min(self.max_delay.as_secs_f64());
		let delay = if self.jitter {
			capped * (0.5 + fastrand::f64())
		} else {
			capped
		};
		Duration::from_secs_f64(delay)
	}
}

/// Returned when every attempt failed. Carries the last error.
#[derive(Debug)]
pub struct RetryExhausted<E> {
	pub attempts: u32,
	pub last_error: E,
}

/// Run `f` until it succeeds or the policy's attempt budget is spent.
///
/// `f` receives the 1-based attempt number. On success the value is returned
/// together with the number of attempts it took.
pub async fn retry<F, Fut, T, E>(
	policy: &RetryPolicy,
	mut f: F,
) -> Result<(T, u32), RetryExhausted<E>>
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: std::fmt::Display,
{
	let max_attempts = policy.max_attempts.max(1);
	let mut attempt = 0;

	loop {
		attempt += 1;
		match f(attempt).await {
			Ok(value) => return Ok((value, attempt)),
			Err(err) => {
				if attempt >= max_attempts {
					warn!(
						error = %err,
						attempt,
						max_attempts,
						"max retry attempts exhausted"
					);
					return Err(RetryExhausted {
						attempts: attempt,
						last_error: err,
					});
				}

				let delay = policy.delay_for(attempt);
				warn!(
					error = %err,
					attempt,
					max_attempts,
					delay_ms = delay.as_millis() as u64,
					"attempt failed, retrying"
				);
				if !delay.is_zero() {
					tokio::time::sleep(delay).await;
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	#[tokio::test]
	async fn stops_on_first_success() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let result: Result<(&str, u32), RetryExhausted<String>> =
			retry(&RetryPolicy::default(), |_| {
				let counter = Arc::clone(&counter);
				async move {
					counter.fetch_add(1, Ordering::SeqCst);
					Ok("accepted")
				}
			})
			.await;

		let (value, attempts) = result.unwrap();
		assert_eq!(value, "accepted");
		assert_eq!(attempts, 1);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn succeeds_on_third_attempt() {
		let result: Result<((), u32), RetryExhausted<String>> =
			retry(&RetryPolicy::default(), |attempt| async move {
				if attempt < 3 {
					Err(format!("rejected on attempt {attempt}"))
				} else {
					Ok(())
				}
			})
			.await;

		assert_eq!(result.unwrap().1, 3);
	}

	#[tokio::test]
	async fn exhausts_budget_and_keeps_last_error() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let result: Result<((), u32), RetryExhausted<String>> =
			retry(&RetryPolicy::default(), |attempt| {
				let counter = Arc::clone(&counter);
				async move {
					counter.fetch_add(1, Ordering::SeqCst);
					Err(format!("failure {attempt}"))
				}
			})
			.await;

		let exhausted = result.unwrap_err();
		assert_eq!(exhausted.attempts, 3);
		assert_eq!(exhausted.last_error, "failure 3");
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn zero_attempt_budget_still_tries_once() {
		let policy = RetryPolicy {
			max_attempts: 0,
			..RetryPolicy::default()
		};
		let result: Result<((), u32), RetryExhausted<String>> =
			retry(&policy, |_| async { Err("nope".to_string()) }).await;
		assert_eq!(result.unwrap_err().attempts, 1);
	}

	#[tokio::test(start_paused = true)]
	async fn fixed_delay_is_applied_between_attempts() {
		let policy = RetryPolicy::fixed(3, Duration::from_millis(250));
		let started = tokio::time::Instant::now();

		let _: Result<((), u32), RetryExhausted<String>> =
			retry(&policy, |_| async { Err("down".to_string()) }).await;

		assert!(started.elapsed() >= Duration::from_millis(500));
	}

	#[test]
	fn default_policy_is_immediate() {
		let policy = RetryPolicy::default();
		assert_eq!(policy.delay_for(1), Duration::ZERO);
		assert_eq!(policy.delay_for(2), Duration::ZERO);
	}

	#[test]
	fn exponential_delay_respects_cap() {
		let policy = RetryPolicy {
			max_attempts: 10,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: false,
		};
		assert_eq!(policy.delay_for(1), Duration::from_secs(1));
		assert_eq!(policy.delay_for(2), Duration::from_secs(2));
		assert_eq!(policy.delay_for(3), Duration::from_secs(4));
		assert_eq!(policy.delay_for(4), Duration::from_secs(5));
	}
}
