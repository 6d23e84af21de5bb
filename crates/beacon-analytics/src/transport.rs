// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Single-attempt delivery of an encoded batch.
//!
//! Retrying is the caller's job; a [`Transport`] makes exactly one request
//! per `send` and reports how it went.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use beacon_common_config::SecretString;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::{AnalyticsError, Result};

/// A POST of one encoded batch.
#[derive(Debug, Clone)]
pub struct BatchRequest {
	pub url: String,
	/// Full `Authorization` header value.
	pub authorization: SecretString,
	pub body: Bytes,
}

/// `Basic base64(write_key + ":")`; the password half is always empty.
pub fn basic_authorization(write_key: &str) -> SecretString {
	SecretString::new(format!("Basic {}", STANDARD.encode(format!("{write_key}:"))))
}

#[async_trait]
pub trait Transport: Send + Sync {
	async fn send(&self, request: &BatchRequest) -> Result<()>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: Client,
}

impl HttpTransport {
	pub fn new(timeout: Duration) -> Result<Self> {
		let client = beacon_common_http::new_client_with_timeout(timeout)?;
		Ok(Self { client })
	}

	pub fn with_client(client: Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn send(&self, request: &BatchRequest) -> Result<()> {
		debug!(url = %request.url, bytes = request.body.len(), "posting analytics batch");

		let response = self
			.client
			.post(&request.url)
			.header(AUTHORIZATION, request.authorization.expose().as_str())
			.header(CONTENT_TYPE, "application/json")
			.body(request.body.clone())
			.send()
			.await?;

		let status = response.status();
		if status.is_success() {
			return Ok(());
		}

		if status == StatusCode::TOO_MANY_REQUESTS {
			let retry_after_secs = response
				.headers()
				.get(RETRY_AFTER)
				.and_then(|v| v.to_str().ok())
				.and_then(|s| s.parse().ok());
			return Err(AnalyticsError::RateLimited { retry_after_secs });
		}

		Err(AnalyticsError::ServerError {
			status: status.as_u16(),
			message: response.text().await.unwrap_or_default(),
		})
	}
}
