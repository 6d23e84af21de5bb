// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Normalized analytics events as they appear inside a batch.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::clock::{format_timestamp, Clock, IdGenerator};
use crate::error::ValidationError;
use crate::message::{Message, ANONYMOUS_ID, CONTEXT, MESSAGE_ID, TIMESTAMP, TYPE, USER_ID};
use crate::validation::validate;
use crate::LIBRARY_NAME;

/// The kind of analytics call. Decides which fields are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
	Identify,
	Track,
	Page,
}

impl EventKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			EventKind::Identify => "identify",
			EventKind::Track => "track",
			EventKind::Page => "page",
		}
	}
}

impl std::fmt::Display for EventKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A validated, normalized event ready to be batched.
///
/// `fields` carries every caller field plus the injected `context`. The
/// `type`, `messageId` and `timestamp` keys live in their own fields and never
/// appear in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	#[serde(rename = "type")]
	pub kind: EventKind,
	#[serde(rename = "messageId")]
	pub message_id: String,
	pub timestamp: String,
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}

impl Event {
	/// Validates `message` for `kind` and normalizes it.
	///
	/// - `context.library.name` is set to [`LIBRARY_NAME`], replacing any caller `library`
	/// - `timestamp` defaults to `clock.now()`
	/// - `messageId` defaults to `ids.message_id()`
	/// - a non-string `userId` / `anonymousId` becomes its compact JSON text
	pub fn normalize(
		kind: EventKind,
		message: Message,
		clock: &dyn Clock,
		ids: &dyn IdGenerator,
	) -> Result<Self, ValidationError> {
		validate(kind, &message)?;

		let mut fields = message.into_map();
		fields.remove(TYPE);

		let timestamp = match fields.remove(TIMESTAMP) {
			Some(Value::String(ts)) => ts,
			_ => format_timestamp(clock.now()),
		};

		let message_id = match fields.remove(MESSAGE_ID) {
			Some(Value::String(id)) => id,
			_ => ids.message_id(),
		};

		let mut context = match fields.remove(CONTEXT) {
			Some(Value::Object(map)) => map,
			_ => Map::new(),
		};
		context.insert("library".to_string(), json!({ "name": LIBRARY_NAME }));
		fields.insert(CONTEXT.to_string(), Value::Object(context));

		for key in [USER_ID, ANONYMOUS_ID] {
			if let Some(value) = fields.get_mut(key) {
				stringify_identity(value);
			}
		}

		Ok(Self {
			kind,
			message_id,
			timestamp,
			fields,
		})
	}

	pub fn user_id(&self) -> Option<&str> {
		self.fields.get(USER_ID).and_then(Value::as_str)
	}

	pub fn anonymous_id(&self) -> Option<&str> {
		self.fields.get(ANONYMOUS_ID).and_then(Value::as_str)
	}

	pub fn library_name(&self) -> Option<&str> {
		self.fields
			.get(CONTEXT)
			.and_then(|c| c.get("library"))
			.and_then(|l| l.get("name"))
			.and_then(Value::as_str)
	}

	/// Size of the event's JSON encoding in bytes.
	pub fn encoded_len(&self) -> usize {
		serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
	}
}

fn stringify_identity(value: &mut Value) {
	match value {
		Value::String(_) | Value::Null => {}
		other => {
			// serde_json maps keep keys sorted, so the text is stable.
			let text = other.to_string();
			*other = Value::String(text);
		}
	}
}
