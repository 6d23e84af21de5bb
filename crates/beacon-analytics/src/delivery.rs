// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sending a batch and reporting its outcome to every waiting callback.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use beacon_analytics_core::BatchPayload;
use beacon_common_config::SecretString;
use beacon_common_http::{RetryPolicy, RetryableError};
use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::error::AnalyticsError;
use crate::transport::{BatchRequest, Transport};

/// Completion callback for an enqueue or flush.
pub type Callback = Box<dyn FnOnce(Delivery) + Send>;

/// Terminal outcome of a flush, shared by every callback of its batch.
///
/// `error` is `None` on success. `batch` is `None` when nothing was sent
/// (disabled client or empty queue).
#[derive(Debug, Clone, Default)]
pub struct Delivery {
	pub error: Option<Arc<AnalyticsError>>,
	pub batch: Option<Arc<BatchPayload>>,
}

impl Delivery {
	pub fn is_ok(&self) -> bool {
		self.error.is_none()
	}
}

/// Resolves with the [`Delivery`] of one flush.
///
/// Dropping the handle does not cancel the flush.
#[derive(Debug)]
pub struct FlushHandle {
	rx: oneshot::Receiver<Delivery>,
}

impl FlushHandle {
	pub(crate) fn new(rx: oneshot::Receiver<Delivery>) -> Self {
		Self { rx }
	}
}

impl Future for FlushHandle {
	type Output = Delivery;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.rx).poll(cx).map(|result| {
			result.unwrap_or_else(|_| Delivery {
				error: Some(Arc::new(AnalyticsError::ClientShutdown)),
				batch: None,
			})
		})
	}
}

/// Runs `callbacks` in order, then completes `done`, all with `delivery`.
///
/// A panicking callback is logged and does not stop the rest.
pub(crate) fn dispatch(
	delivery: Delivery,
	callbacks: Vec<Callback>,
	done: Option<oneshot::Sender<Delivery>>,
) {
	for callback in callbacks {
		let outcome = delivery.clone();
		if panic::catch_unwind(AssertUnwindSafe(move || callback(outcome))).is_err() {
			error!("analytics callback panicked");
		}
	}

	if let Some(done) = done {
		// The flush handle may have been dropped.
		let _ = done.send(delivery);
	}
}

pub(crate) struct Outbound {
	pub url: String,
	pub authorization: SecretString,
	pub batch: Arc<BatchPayload>,
	pub callbacks: Vec<Callback>,
	pub done: Option<oneshot::Sender<Delivery>>,
}

/// Encodes and sends `outbound.batch` with retries, then dispatches.
pub(crate) async fn deliver(transport: Arc<dyn Transport>, policy: RetryPolicy, outbound: Outbound) {
	let Outbound {
		url,
		authorization,
		batch,
		callbacks,
		done,
	} = outbound;

	let error = match batch.to_json_bytes() {
		Ok(body) => {
			let request = BatchRequest {
				url,
				authorization,
				body: Bytes::from(body),
			};
			send_with_retry(transport.as_ref(), &policy, &request)
				.await
				.err()
		}
		Err(e) => Some(AnalyticsError::Serialization(e)),
	};

	match &error {
		None => debug!(events = batch.len(), "analytics batch delivered"),
		Some(e) => warn!(events = batch.len(), error = %e, "analytics batch dropped"),
	}

	let delivery = Delivery {
		error: error.map(Arc::new),
		batch: Some(batch),
	};
	dispatch(delivery, callbacks, done);
}

async fn send_with_retry(
	transport: &dyn Transport,
	policy: &RetryPolicy,
	request: &BatchRequest,
) -> Result<(), AnalyticsError> {
	beacon_common_http::retry(policy, move || transport.send(request))
		.await
		.map_err(|e| {
			if e.is_retryable() {
				AnalyticsError::RetriesExhausted {
					attempts: policy.max_attempts(),
					source: Box::new(e),
				}
			} else {
				e
			}
		})
}
