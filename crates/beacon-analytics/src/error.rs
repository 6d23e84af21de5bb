// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics client.

use beacon_analytics_core::ValidationError;
use beacon_common_http::{is_retryable_status, RetryableError};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// The message was rejected before it reached the queue.
	#[error("invalid message: {0}")]
	Validation(#[from] ValidationError),

	#[error("write key is missing or empty")]
	InvalidWriteKey,

	#[error("invalid host: {0}")]
	InvalidHost(String),

	/// `build()` was called outside a tokio runtime.
	#[error("analytics client must be built inside a tokio runtime")]
	NoRuntime,

	#[error("client has been shut down")]
	ClientShutdown,

	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },

	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },

	/// A retryable failure persisted through every attempt.
	#[error("gave up after {attempts} attempts: {source}")]
	RetriesExhausted {
		attempts: u32,
		#[source]
		source: Box<AnalyticsError>,
	},

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl RetryableError for AnalyticsError {
	fn is_retryable(&self) -> bool {
		match self {
			AnalyticsError::RequestFailed(e) => e.is_retryable(),
			AnalyticsError::ServerError { status, .. } => StatusCode::from_u16(*status)
				.map(is_retryable_status)
				.unwrap_or(false),
			AnalyticsError::RateLimited { .. } => true,
			_ => false,
		}
	}
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
