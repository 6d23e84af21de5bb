// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Analytics client configuration section.

use std::time::Duration;

use beacon_analytics_core::{
	DEFAULT_FLUSH_AT, DEFAULT_FLUSH_INTERVAL, DEFAULT_HOST, DEFAULT_RETRY_COUNT, MAX_QUEUE_SIZE_BYTES,
};
use serde::{Deserialize, Serialize};

use crate::secret::SecretString;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Configuration layer for the analytics client (all fields optional for merging).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsConfigLayer {
	/// Write key identifying the source. Sent as the Basic auth username.
	pub write_key: Option<SecretString>,
	pub host: Option<String>,
	/// Queue length that triggers a flush.
	pub flush_at: Option<usize>,
	pub flush_interval_ms: Option<u64>,
	pub max_queue_size_bytes: Option<usize>,
	/// Retries after the first attempt.
	pub retry_count: Option<u32>,
	pub request_timeout_secs: Option<u64>,
	/// When false every call is accepted and nothing is sent.
	pub enabled: Option<bool>,
}

impl AnalyticsConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: Self) {
		if other.write_key.is_some() {
			self.write_key = other.write_key;
		}
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.flush_at.is_some() {
			self.flush_at = other.flush_at;
		}
		if other.flush_interval_ms.is_some() {
			self.flush_interval_ms = other.flush_interval_ms;
		}
		if other.max_queue_size_bytes.is_some() {
			self.max_queue_size_bytes = other.max_queue_size_bytes;
		}
		if other.retry_count.is_some() {
			self.retry_count = other.retry_count;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
	}

	pub fn finalize(self) -> AnalyticsConfig {
		let defaults = AnalyticsConfig::default();
		AnalyticsConfig {
			write_key: self.write_key,
			host: self.host.unwrap_or(defaults.host),
			flush_at: self.flush_at.unwrap_or(defaults.flush_at).max(1),
			flush_interval: self
				.flush_interval_ms
				.map(Duration::from_millis)
				.unwrap_or(defaults.flush_interval),
			max_queue_size_bytes: self
				.max_queue_size_bytes
				.unwrap_or(defaults.max_queue_size_bytes),
			retry_count: self.retry_count.unwrap_or(defaults.retry_count),
			request_timeout: self
				.request_timeout_secs
				.map(Duration::from_secs)
				.unwrap_or(defaults.request_timeout),
			enabled: self.enabled.unwrap_or(defaults.enabled),
		}
	}
}

/// Resolved analytics client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
	/// `None` when no source supplied a key. The client rejects that at build.
	pub write_key: Option<SecretString>,
	pub host: String,
	pub flush_at: usize,
	pub flush_interval: Duration,
	pub max_queue_size_bytes: usize,
	pub retry_count: u32,
	pub request_timeout: Duration,
	pub enabled: bool,
}

impl Default for AnalyticsConfig {
	fn default() -> Self {
		Self {
			write_key: None,
			host: DEFAULT_HOST.to_string(),
			flush_at: DEFAULT_FLUSH_AT,
			flush_interval: DEFAULT_FLUSH_INTERVAL,
			max_queue_size_bytes: MAX_QUEUE_SIZE_BYTES,
			retry_count: DEFAULT_RETRY_COUNT,
			request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
			enabled: true,
		}
	}
}
