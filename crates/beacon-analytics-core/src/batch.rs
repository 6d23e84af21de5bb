// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The request body posted to the batch endpoint.

use serde::{Deserialize, Serialize};

use crate::clock::{format_timestamp, Clock};
use crate::event::Event;

/// `{ "batch": [...], "timestamp": ..., "sentAt": ... }`
///
/// `timestamp` and `sentAt` are both stamped with the construction time; the
/// wire schema requires both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload {
	pub batch: Vec<Event>,
	pub timestamp: String,
	pub sent_at: String,
}

impl BatchPayload {
	pub fn new(batch: Vec<Event>, clock: &dyn Clock) -> Self {
		let now = format_timestamp(clock.now());
		Self {
			batch,
			timestamp: now.clone(),
			sent_at: now,
		}
	}

	pub fn len(&self) -> usize {
		self.batch.len()
	}

	pub fn is_empty(&self) -> bool {
		self.batch.is_empty()
	}

	/// Message ids in batch order.
	pub fn message_ids(&self) -> impl Iterator<Item = &str> {
		self.batch.iter().map(|e| e.message_id.as_str())
	}

	pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
		serde_json::to_vec(self)
	}
}
