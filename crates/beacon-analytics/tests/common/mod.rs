// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use beacon_analytics::{
	Analytics, AnalyticsBuilder, AnalyticsError, BatchRequest, Clock, Delivery, IdGenerator,
	Result, Transport,
};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

/// Answers each send with the next scripted status, then `fallback`.
pub struct ScriptedTransport {
	script: Mutex<VecDeque<u16>>,
	fallback: u16,
	requests: Mutex<Vec<BatchRequest>>,
}

impl ScriptedTransport {
	pub fn ok() -> Arc<Self> {
		Self::always(200)
	}

	pub fn always(status: u16) -> Arc<Self> {
		Self::script([], status)
	}

	pub fn script(statuses: impl IntoIterator<Item = u16>, fallback: u16) -> Arc<Self> {
		Arc::new(Self {
			script: Mutex::new(statuses.into_iter().collect()),
			fallback,
			requests: Mutex::new(Vec::new()),
		})
	}

	pub fn attempts(&self) -> usize {
		self.requests.lock().len()
	}

	pub fn requests(&self) -> Vec<BatchRequest> {
		self.requests.lock().clone()
	}

	/// Decoded bodies of every attempt, in send order.
	pub fn bodies(&self) -> Vec<Value> {
		self.requests
			.lock()
			.iter()
			.map(|r| serde_json::from_slice(&r.body).unwrap())
			.collect()
	}

	/// Number of events in each attempt's batch.
	pub fn batch_sizes(&self) -> Vec<usize> {
		self.bodies()
			.iter()
			.map(|b| b["batch"].as_array().unwrap().len())
			.collect()
	}
}

#[async_trait]
impl Transport for ScriptedTransport {
	async fn send(&self, request: &BatchRequest) -> Result<()> {
		self.requests.lock().push(request.clone());
		let status = self.script.lock().pop_front().unwrap_or(self.fallback);
		match status {
			200..=299 => Ok(()),
			429 => Err(AnalyticsError::RateLimited {
				retry_after_secs: None,
			}),
			status => Err(AnalyticsError::ServerError {
				status,
				message: "scripted".to_string(),
			}),
		}
	}
}

pub struct FixedClock;

impl FixedClock {
	pub const TIMESTAMP: &'static str = "2024-06-01T12:00:00.000Z";
}

impl Clock for FixedClock {
	fn now(&self) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
	}
}

/// `id-0`, `id-1`, ...
#[derive(Default)]
pub struct SequentialIds(AtomicUsize);

impl IdGenerator for SequentialIds {
	fn message_id(&self) -> String {
		format!("id-{}", self.0.fetch_add(1, Ordering::SeqCst))
	}
}

pub fn builder(transport: Arc<ScriptedTransport>) -> AnalyticsBuilder {
	Analytics::builder()
		.write_key("wk_test")
		.host("http://collector.test")
		.transport(transport)
		.clock(Arc::new(FixedClock))
		.id_generator(Arc::new(SequentialIds::default()))
}

/// A callback that forwards its delivery to the returned receiver.
pub fn capture() -> (
	impl FnOnce(Delivery) + Send + 'static,
	oneshot::Receiver<Delivery>,
) {
	let (tx, rx) = oneshot::channel();
	(
		move |delivery: Delivery| {
			let _ = tx.send(delivery);
		},
		rx,
	)
}

/// A callback that counts its invocations.
pub fn counter() -> (
	impl FnOnce(Delivery) + Send + 'static,
	Arc<AtomicUsize>,
) {
	let count = Arc::new(AtomicUsize::new(0));
	let seen = count.clone();
	(
		move |_: Delivery| {
			seen.fetch_add(1, Ordering::SeqCst);
		},
		count,
	)
}
