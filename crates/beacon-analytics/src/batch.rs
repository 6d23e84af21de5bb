// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory event queue and its flush triggers.

use std::collections::VecDeque;

use beacon_analytics_core::Event;
use tokio::task::AbortHandle;

use crate::delivery::Callback;

/// A normalized event waiting for a flush, with its encoded size.
pub(crate) struct QueueEntry {
	pub event: Event,
	pub size: usize,
	pub callback: Option<Callback>,
}

impl QueueEntry {
	pub fn new(event: Event, callback: Option<Callback>) -> Self {
		let size = event.encoded_len();
		Self {
			event,
			size,
			callback,
		}
	}
}

/// What an enqueue asks of the client, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
	/// First event this queue has ever seen.
	FirstEvent,
	/// Count or byte threshold reached.
	Threshold,
	/// Below thresholds with no timer pending.
	ArmTimer,
	/// A timer is already pending.
	Wait,
}

impl Trigger {
	pub fn flushes(self) -> bool {
		matches!(self, Trigger::FirstEvent | Trigger::Threshold)
	}
}

/// FIFO of pending entries.
///
/// Every mutation happens under the client's lock, so a push and the batch
/// take it triggers are one atomic step.
pub(crate) struct EventQueue {
	entries: VecDeque<QueueEntry>,
	bytes: usize,
	seen_first: bool,
	timer: Option<AbortHandle>,
}

impl EventQueue {
	pub fn new() -> Self {
		Self {
			entries: VecDeque::new(),
			bytes: 0,
			seen_first: false,
			timer: None,
		}
	}

	/// Appends `entry` and decides what should happen next.
	pub fn push(&mut self, entry: QueueEntry, flush_at: usize, max_bytes: usize) -> Trigger {
		self.bytes += entry.size;
		self.entries.push_back(entry);

		if !self.seen_first {
			self.seen_first = true;
			return Trigger::FirstEvent;
		}
		if self.entries.len() >= flush_at || self.bytes >= max_bytes {
			return Trigger::Threshold;
		}
		if self.timer.is_none() {
			return Trigger::ArmTimer;
		}
		Trigger::Wait
	}

	/// Cancels any pending timer and removes up to `flush_at` entries from the head.
	pub fn take_batch(&mut self, flush_at: usize) -> Vec<QueueEntry> {
		self.cancel_timer();
		let n = flush_at.min(self.entries.len());
		let batch: Vec<QueueEntry> = self.entries.drain(..n).collect();
		let taken: usize = batch.iter().map(|e| e.size).sum();
		self.bytes = self.bytes.saturating_sub(taken);
		batch
	}

	pub fn set_timer(&mut self, timer: AbortHandle) {
		if let Some(old) = self.timer.replace(timer) {
			old.abort();
		}
	}

	pub fn cancel_timer(&mut self) {
		if let Some(timer) = self.timer.take() {
			timer.abort();
		}
	}

	pub fn has_timer(&self) -> bool {
		self.timer.is_some()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn bytes(&self) -> usize {
		self.bytes
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use beacon_analytics_core::{EventKind, Message, SystemClock, UuidGenerator};
	use proptest::prelude::*;

	const NO_BYTE_LIMIT: usize = usize::MAX;

	fn entry(i: usize) -> QueueEntry {
		let message = Message::new()
			.with_user_id(format!("u{i}"))
			.with_event("e")
			.with_message_id(format!("m{i}"));
		let event = Event::normalize(EventKind::Track, message, &SystemClock, &UuidGenerator).unwrap();
		QueueEntry::new(event, None)
	}

	#[test]
	fn test_first_event_flushes() {
		let mut queue = EventQueue::new();
		assert_eq!(queue.push(entry(0), 20, NO_BYTE_LIMIT), Trigger::FirstEvent);
		queue.take_batch(20);
		assert_eq!(queue.push(entry(1), 20, NO_BYTE_LIMIT), Trigger::ArmTimer);
	}

	#[test]
	fn test_count_threshold() {
		let mut queue = EventQueue::new();
		queue.push(entry(0), 3, NO_BYTE_LIMIT);
		queue.take_batch(3);

		assert_eq!(queue.push(entry(1), 3, NO_BYTE_LIMIT), Trigger::ArmTimer);
		assert_eq!(queue.push(entry(2), 3, NO_BYTE_LIMIT), Trigger::ArmTimer);
		assert_eq!(queue.push(entry(3), 3, NO_BYTE_LIMIT), Trigger::Threshold);
		assert_eq!(queue.len(), 3);
	}

	#[test]
	fn test_byte_threshold() {
		let mut queue = EventQueue::new();
		queue.push(entry(0), 100, NO_BYTE_LIMIT);
		queue.take_batch(100);
		assert_eq!(queue.bytes(), 0);

		let first = entry(1);
		let limit = first.size * 2;
		assert_eq!(queue.push(first, 100, limit), Trigger::ArmTimer);
		assert_eq!(queue.push(entry(2), 100, limit), Trigger::Threshold);
	}

	#[test]
	fn test_take_batch_is_bounded_prefix() {
		let mut queue = EventQueue::new();
		for i in 0..5 {
			queue.push(entry(i), 100, NO_BYTE_LIMIT);
		}
		let batch = queue.take_batch(2);
		let ids: Vec<_> = batch.iter().map(|e| e.event.message_id.as_str()).collect();
		assert_eq!(ids, vec!["m0", "m1"]);
		assert_eq!(queue.len(), 3);

		let remaining: usize = queue.take_batch(10).iter().map(|e| e.size).sum();
		assert!(remaining > 0);
		assert_eq!(queue.bytes(), 0);
		assert!(queue.is_empty());
	}

	#[tokio::test]
	async fn test_take_batch_cancels_timer() {
		let mut queue = EventQueue::new();
		let task = tokio::spawn(std::future::pending::<()>());
		queue.set_timer(task.abort_handle());
		assert!(queue.has_timer());

		queue.take_batch(1);
		assert!(!queue.has_timer());
		assert!(task.await.unwrap_err().is_cancelled());
	}

	proptest! {
		#[test]
		fn batches_preserve_fifo_order(n in 1usize..40, flush_at in 1usize..10) {
			let mut queue = EventQueue::new();
			let mut flushed = Vec::new();
			for i in 0..n {
				if queue.push(entry(i), flush_at, NO_BYTE_LIMIT).flushes() {
					flushed.extend(queue.take_batch(flush_at));
				}
			}
			while !queue.is_empty() {
				flushed.extend(queue.take_batch(flush_at));
			}

			let ids: Vec<String> = flushed.into_iter().map(|e| e.event.message_id).collect();
			let expected: Vec<String> = (0..n).map(|i| format!("m{i}")).collect();
			prop_assert_eq!(ids, expected);
		}

		#[test]
		fn threshold_fires_once_per_flush_at_events(n in 1usize..60, flush_at in 1usize..8) {
			let mut queue = EventQueue::new();
			let mut flushes = 0;
			for i in 0..n {
				if queue.push(entry(i), flush_at, NO_BYTE_LIMIT).flushes() {
					flushes += 1;
					queue.take_batch(flush_at);
				}
			}
			// One for the first event, then one per full batch after it.
			prop_assert_eq!(flushes, 1 + (n - 1) / flush_at);
			prop_assert!(queue.len() < flush_at);
		}
	}
}
