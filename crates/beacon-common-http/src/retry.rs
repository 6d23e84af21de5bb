// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Bounded retry with exponential backoff for HTTP requests.

use reqwest::StatusCode;
use std::time::Duration;
use tracing::warn;

/// How a failed operation is retried.
///
/// After the failed attempt `n` (starting at 0) the operation sleeps
/// `base_delay * backoff_factor^n` and tries again, as long as `n < retry_count`.
/// An operation is therefore attempted at most `retry_count + 1` times.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	/// Number of retries after the initial attempt.
	pub retry_count: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	/// Scale each delay by a random factor in `[0.5, 1.5)`. Off by default, so
	/// clients failing together retry in lockstep.
	pub jitter: bool,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			retry_count: 3,
			base_delay: Duration::from_millis(100),
			max_delay: Duration::from_secs(30),
			backoff_factor: 2.0,
			jitter: false,
		}
	}
}

impl RetryPolicy {
	/// Returns a policy with the given retry ceiling and default backoff.
	pub fn with_retry_count(retry_count: u32) -> Self {
		Self {
			retry_count,
			..Self::default()
		}
	}

	/// Total number of attempts, including the initial one.
	pub fn max_attempts(&self) -> u32 {
		self.retry_count.saturating_add(1)
	}

	/// Delay to wait after the failed attempt `attempt` (0-based).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let exponential_delay =
			self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
		let capped_delay = exponential_delay.min(self.max_delay.as_secs_f64());

		let final_delay = if self.jitter {
			let jitter_factor = 0.5 + fastrand::f64();
			capped_delay * jitter_factor
		} else {
			capped_delay
		};

		Duration::from_secs_f64(final_delay)
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

/// Returns true for statuses worth retrying: any 5xx, and 429.
pub fn is_retryable_status(status: StatusCode) -> bool {
	status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if let Some(status) = self.status() {
			return is_retryable_status(status);
		}

		// No response was received. A request error covers a connection that was
		// reset or closed mid-request. Builder, redirect, body and decode errors
		// fail the same way again.
		if self.is_builder() || self.is_redirect() || self.is_body() || self.is_decode() {
			return false;
		}
		self.is_timeout() || self.is_connect() || self.is_request()
	}
}

/// Runs `f` until it succeeds, fails with a non-retryable error, or the retry
/// ceiling is reached.
///
/// The last error is returned unchanged. An error that is still retryable
/// means the attempts were exhausted.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug,
{
	let mut attempt: u32 = 0;

	loop {
		match f().await {
			Ok(result) => return Ok(result),
			Err(err) => {
				if !err.is_retryable() {
					warn!(
							error = ?err,
							attempt = attempt + 1,
							"non-retryable error encountered"
					);
					return Err(err);
				}

				if attempt >= policy.retry_count {
					warn!(
							error = ?err,
							attempt = attempt + 1,
							max_attempts = policy.max_attempts(),
							"max retry attempts exhausted"
					);
					return Err(err);
				}

				let delay = policy.delay_for(attempt);
				warn!(
						error = ?err,
						attempt = attempt + 1,
						max_attempts = policy.max_attempts(),
						delay_ms = delay.as_millis() as u64,
						"retrying after error"
				);

				tokio::time::sleep(delay).await;
				attempt += 1;
			}
		}
	}
}
