// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The analytics client handle and its builder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use beacon_analytics_core::{
	BatchPayload, Clock, Event, EventKind, IdGenerator, Message, SystemClock, UuidGenerator,
	BATCH_PATH, DEFAULT_FLUSH_AT, DEFAULT_FLUSH_INTERVAL, DEFAULT_HOST, MAX_QUEUE_SIZE_BYTES,
};
use beacon_common_config::{AnalyticsConfig, SecretString};
use beacon_common_http::RetryPolicy;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::batch::{EventQueue, QueueEntry, Trigger};
use crate::delivery::{deliver, dispatch, Callback, Delivery, FlushHandle, Outbound};
use crate::error::{AnalyticsError, Result};
use crate::transport::{basic_authorization, HttpTransport, Transport};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for [`Analytics`].
pub struct AnalyticsBuilder {
	write_key: Option<SecretString>,
	host: String,
	flush_at: usize,
	flush_interval: Duration,
	max_queue_size_bytes: usize,
	retry_policy: RetryPolicy,
	request_timeout: Duration,
	enabled: bool,
	transport: Option<Arc<dyn Transport>>,
	clock: Arc<dyn Clock>,
	ids: Arc<dyn IdGenerator>,
}

impl Default for AnalyticsBuilder {
	fn default() -> Self {
		Self {
			write_key: None,
			host: DEFAULT_HOST.to_string(),
			flush_at: DEFAULT_FLUSH_AT,
			flush_interval: DEFAULT_FLUSH_INTERVAL,
			max_queue_size_bytes: MAX_QUEUE_SIZE_BYTES,
			retry_policy: RetryPolicy::default(),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			enabled: true,
			transport: None,
			clock: Arc::new(SystemClock),
			ids: Arc::new(UuidGenerator),
		}
	}
}

impl AnalyticsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Applies a resolved configuration. Later builder calls still win.
	pub fn config(mut self, config: &AnalyticsConfig) -> Self {
		if let Some(key) = &config.write_key {
			self.write_key = Some(key.clone());
		}
		self.host = config.host.clone();
		self.flush_at = config.flush_at;
		self.flush_interval = config.flush_interval;
		self.max_queue_size_bytes = config.max_queue_size_bytes;
		self.retry_policy.retry_count = config.retry_count;
		self.request_timeout = config.request_timeout;
		self.enabled = config.enabled;
		self
	}

	pub fn write_key(mut self, key: impl Into<SecretString>) -> Self {
		self.write_key = Some(key.into());
		self
	}

	/// Collection endpoint host, e.g. `https://api.segment.io`.
	pub fn host(mut self, host: impl Into<String>) -> Self {
		self.host = host.into();
		self
	}

	/// Queue length that triggers a flush. Values below 1 are treated as 1.
	pub fn flush_at(mut self, flush_at: usize) -> Self {
		self.flush_at = flush_at;
		self
	}

	pub fn flush_interval(mut self, interval: Duration) -> Self {
		self.flush_interval = interval;
		self
	}

	pub fn max_queue_size_bytes(mut self, bytes: usize) -> Self {
		self.max_queue_size_bytes = bytes;
		self
	}

	pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry_policy = policy;
		self
	}

	pub fn retry_count(mut self, retry_count: u32) -> Self {
		self.retry_policy.retry_count = retry_count;
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;
		self
	}

	/// A disabled client validates messages, sends nothing and reports success.
	pub fn enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;
		self
	}

	/// Replaces the HTTP transport.
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
		self.ids = ids;
		self
	}

	/// Builds the client on the current tokio runtime.
	///
	/// A write key is required unless the client is disabled.
	pub fn build(self) -> Result<Analytics> {
		let runtime = Handle::try_current().map_err(|_| AnalyticsError::NoRuntime)?;

		let write_key = match self.write_key {
			Some(key) if !key.is_blank() => key,
			_ if !self.enabled => SecretString::new(String::new()),
			_ => return Err(AnalyticsError::InvalidWriteKey),
		};

		let host = normalize_host(&self.host)?;

		let transport: Arc<dyn Transport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(HttpTransport::new(self.request_timeout)?),
		};

		let flush_at = self.flush_at.max(1);

		info!(
			host = %host,
			flush_at,
			flush_interval_ms = self.flush_interval.as_millis() as u64,
			retry_count = self.retry_policy.retry_count,
			enabled = self.enabled,
			"analytics client initialized"
		);

		Ok(Analytics {
			inner: Arc::new(AnalyticsInner {
				url: format!("{host}{BATCH_PATH}"),
				authorization: basic_authorization(write_key.expose()),
				flush_at,
				flush_interval: self.flush_interval,
				max_queue_size_bytes: self.max_queue_size_bytes,
				retry_policy: self.retry_policy,
				enabled: self.enabled,
				closed: AtomicBool::new(false),
				queue: Mutex::new(EventQueue::new()),
				in_flight: Mutex::new(Vec::new()),
				transport,
				clock: self.clock,
				ids: self.ids,
				runtime,
			}),
		})
	}
}

fn normalize_host(host: &str) -> Result<String> {
	let host = host.trim_end_matches('/');
	let url = reqwest::Url::parse(host).map_err(|e| AnalyticsError::InvalidHost(format!("{host}: {e}")))?;
	if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
		return Err(AnalyticsError::InvalidHost(host.to_string()));
	}
	Ok(host.to_string())
}

/// Batching analytics client.
///
/// Cheap to clone; clones share one queue. Enqueue and flush calls never
/// block on I/O: sends and timers run on the runtime captured at build time.
#[derive(Clone)]
pub struct Analytics {
	inner: Arc<AnalyticsInner>,
}

struct AnalyticsInner {
	url: String,
	authorization: SecretString,
	flush_at: usize,
	flush_interval: Duration,
	max_queue_size_bytes: usize,
	retry_policy: RetryPolicy,
	enabled: bool,
	closed: AtomicBool,
	queue: Mutex<EventQueue>,
	in_flight: Mutex<Vec<JoinHandle<()>>>,
	transport: Arc<dyn Transport>,
	clock: Arc<dyn Clock>,
	ids: Arc<dyn IdGenerator>,
	runtime: Handle,
}

impl Analytics {
	pub fn builder() -> AnalyticsBuilder {
		AnalyticsBuilder::new()
	}

	pub fn identify(&self, message: Message) -> Result<&Self> {
		self.enqueue(EventKind::Identify, message, None)
	}

	pub fn identify_with<F>(&self, message: Message, callback: F) -> Result<&Self>
	where
		F: FnOnce(Delivery) + Send + 'static,
	{
		self.enqueue(EventKind::Identify, message, Some(Box::new(callback)))
	}

	pub fn track(&self, message: Message) -> Result<&Self> {
		self.enqueue(EventKind::Track, message, None)
	}

	pub fn track_with<F>(&self, message: Message, callback: F) -> Result<&Self>
	where
		F: FnOnce(Delivery) + Send + 'static,
	{
		self.enqueue(EventKind::Track, message, Some(Box::new(callback)))
	}

	pub fn page(&self, message: Message) -> Result<&Self> {
		self.enqueue(EventKind::Page, message, None)
	}

	pub fn page_with<F>(&self, message: Message, callback: F) -> Result<&Self>
	where
		F: FnOnce(Delivery) + Send + 'static,
	{
		self.enqueue(EventKind::Page, message, Some(Box::new(callback)))
	}

	/// Sends up to `flush_at` queued events now.
	pub fn flush(&self) -> FlushHandle {
		self.inner.flush(None)
	}

	/// Like [`flush`](Self::flush), also calling `callback` with the outcome.
	pub fn flush_with<F>(&self, callback: F) -> FlushHandle
	where
		F: FnOnce(Delivery) + Send + 'static,
	{
		self.inner.flush(Some(Box::new(callback)))
	}

	/// Stops accepting events, sends everything still queued and waits for
	/// every in-flight batch. Calling it again is harmless.
	pub async fn shutdown(&self) {
		{
			// Under the queue lock so no enqueue can slip in behind the drain.
			let mut queue = self.inner.queue.lock();
			if !self.inner.closed.swap(true, Ordering::AcqRel) {
				info!(queued = queue.len(), "shutting down analytics client");
			}
			queue.cancel_timer();
		}

		loop {
			let empty = self.inner.queue.lock().is_empty();
			if empty {
				break;
			}
			self.inner.flush(None).await;
		}

		let tasks = std::mem::take(&mut *self.inner.in_flight.lock());
		for task in tasks {
			if let Err(e) = task.await {
				warn!(error = %e, "analytics delivery task failed");
			}
		}
	}

	pub fn queue_len(&self) -> usize {
		self.inner.queue.lock().len()
	}

	/// Encoded size of the queued events.
	pub fn queued_bytes(&self) -> usize {
		self.inner.queue.lock().bytes()
	}

	pub fn flush_timer_pending(&self) -> bool {
		self.inner.queue.lock().has_timer()
	}

	pub fn is_enabled(&self) -> bool {
		self.inner.enabled
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::Acquire)
	}

	fn enqueue(&self, kind: EventKind, message: Message, callback: Option<Callback>) -> Result<&Self> {
		let inner = &self.inner;
		let event = Event::normalize(kind, message, inner.clock.as_ref(), inner.ids.as_ref())?;

		let mut queue = inner.queue.lock();
		if inner.closed.load(Ordering::Acquire) {
			return Err(AnalyticsError::ClientShutdown);
		}

		if !inner.enabled {
			drop(queue);
			inner.complete_empty(callback.into_iter().collect(), None);
			return Ok(self);
		}

		let entry = QueueEntry::new(event, callback);
		let trigger = queue.push(entry, inner.flush_at, inner.max_queue_size_bytes);
		debug!(kind = %kind, queued = queue.len(), ?trigger, "event enqueued");

		match trigger {
			t if t.flushes() => {
				let entries = queue.take_batch(inner.flush_at);
				drop(queue);
				inner.start_delivery(entries, None, None);
			}
			Trigger::ArmTimer => {
				let timer = AnalyticsInner::arm_timer(inner);
				queue.set_timer(timer);
			}
			_ => {}
		}

		Ok(self)
	}
}

impl AnalyticsInner {
	fn flush(&self, callback: Option<Callback>) -> FlushHandle {
		let (tx, rx) = oneshot::channel();

		let entries = if self.enabled {
			self.queue.lock().take_batch(self.flush_at)
		} else {
			Vec::new()
		};

		if entries.is_empty() {
			self.complete_empty(callback.into_iter().collect(), Some(tx));
		} else {
			self.start_delivery(entries, callback, Some(tx));
		}

		FlushHandle::new(rx)
	}

	fn start_delivery(
		&self,
		entries: Vec<QueueEntry>,
		flush_callback: Option<Callback>,
		done: Option<oneshot::Sender<Delivery>>,
	) {
		let mut events = Vec::with_capacity(entries.len());
		let mut callbacks = Vec::with_capacity(entries.len() + 1);
		for entry in entries {
			events.push(entry.event);
			callbacks.extend(entry.callback);
		}
		callbacks.extend(flush_callback);

		let batch = Arc::new(BatchPayload::new(events, self.clock.as_ref()));
		debug!(events = batch.len(), "flushing analytics batch");

		let outbound = Outbound {
			url: self.url.clone(),
			authorization: self.authorization.clone(),
			batch,
			callbacks,
			done,
		};
		let task = self.runtime.spawn(deliver(
			self.transport.clone(),
			self.retry_policy.clone(),
			outbound,
		));

		let mut in_flight = self.in_flight.lock();
		in_flight.retain(|t| !t.is_finished());
		in_flight.push(task);
	}

	/// Reports an empty delivery on a later tick.
	fn complete_empty(&self, callbacks: Vec<Callback>, done: Option<oneshot::Sender<Delivery>>) {
		self.runtime.spawn(async move {
			dispatch(Delivery::default(), callbacks, done);
		});
	}

	fn arm_timer(this: &Arc<Self>) -> AbortHandle {
		let weak: Weak<Self> = Arc::downgrade(this);
		let interval = this.flush_interval;
		this.runtime
			.spawn(async move {
				tokio::time::sleep(interval).await;
				if let Some(inner) = weak.upgrade() {
					debug!("flush interval elapsed");
					inner.flush(None);
				}
			})
			.abort_handle()
	}
}

impl Drop for AnalyticsInner {
	/// Sends whatever is still queued when the last handle goes away, so every
	/// queued callback still fires.
	fn drop(&mut self) {
		self.queue.get_mut().cancel_timer();
		loop {
			let entries = self.queue.get_mut().take_batch(self.flush_at);
			if entries.is_empty() {
				break;
			}
			debug!(events = entries.len(), "analytics client dropped with queued events");
			self.start_delivery(entries, None, None);
		}
	}
}

impl std::fmt::Debug for Analytics {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Analytics")
			.field("url", &self.inner.url)
			.field("flush_at", &self.inner.flush_at)
			.field("flush_interval", &self.inner.flush_interval)
			.field("enabled", &self.inner.enabled)
			.field("closed", &self.is_closed())
			.field("queued", &self.queue_len())
			.finish_non_exhaustive()
	}
}
