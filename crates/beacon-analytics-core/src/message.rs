// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builder for the caller-supplied message of an analytics call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::format_timestamp;
use crate::error::ValidationError;

pub(crate) const USER_ID: &str = "userId";
pub(crate) const ANONYMOUS_ID: &str = "anonymousId";
pub(crate) const EVENT: &str = "event";
pub(crate) const NAME: &str = "name";
pub(crate) const PROPERTIES: &str = "properties";
pub(crate) const TRAITS: &str = "traits";
pub(crate) const CONTEXT: &str = "context";
pub(crate) const TIMESTAMP: &str = "timestamp";
pub(crate) const MESSAGE_ID: &str = "messageId";
pub(crate) const TYPE: &str = "type";

/// The raw fields of an `identify`, `track` or `page` call.
///
/// A message is an open JSON object: any field is accepted and forwarded as-is.
/// The `with_*` helpers set the fields the wire format gives meaning to.
///
/// # Example
///
/// ```
/// use beacon_analytics_core::Message;
///
/// let message = Message::new()
///     .with_user_id("0x5aeda56215b167893e80b4fe645ba6d5bab767de")
///     .with_event("Swap Completed")
///     .with_properties(serde_json::json!({"chain_id": "0x1"}))
///     .insert("category", "Swaps");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message {
	inner: Map<String, Value>,
}

impl Message {
	/// Creates an empty message.
	pub fn new() -> Self {
		Self { inner: Map::new() }
	}

	/// Inserts an arbitrary field.
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		self.inner.insert(key.into(), value.into());
		self
	}

	/// Merges another message into this one. Fields of `other` win.
	pub fn merge(mut self, other: Message) -> Self {
		for (k, v) in other.inner {
			self.inner.insert(k, v);
		}
		self
	}

	/// Sets `userId`. Non-string values are stringified at normalization.
	pub fn with_user_id(self, user_id: impl Into<Value>) -> Self {
		self.insert(USER_ID, user_id)
	}

	/// Sets `anonymousId`. Non-string values are stringified at normalization.
	pub fn with_anonymous_id(self, anonymous_id: impl Into<Value>) -> Self {
		self.insert(ANONYMOUS_ID, anonymous_id)
	}

	/// Sets the `event` name of a track call.
	pub fn with_event(self, event: impl Into<String>) -> Self {
		self.insert(EVENT, event.into())
	}

	/// Sets the `name` of a page call.
	pub fn with_name(self, name: impl Into<String>) -> Self {
		self.insert(NAME, name.into())
	}

	pub fn with_properties(self, properties: impl Into<Value>) -> Self {
		self.insert(PROPERTIES, properties)
	}

	pub fn with_traits(self, traits: impl Into<Value>) -> Self {
		self.insert(TRAITS, traits)
	}

	/// Sets the caller context. `context.library` is always overwritten.
	pub fn with_context(self, context: impl Into<Value>) -> Self {
		self.insert(CONTEXT, context)
	}

	pub fn with_timestamp(self, timestamp: DateTime<Utc>) -> Self {
		self.insert(TIMESTAMP, format_timestamp(timestamp))
	}

	pub fn with_message_id(self, message_id: impl Into<String>) -> Self {
		self.insert(MESSAGE_ID, message_id.into())
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.inner.get(key)
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn into_map(self) -> Map<String, Value> {
		self.inner
	}

	pub fn into_value(self) -> Value {
		Value::Object(self.inner)
	}
}

impl From<Message> for Value {
	fn from(message: Message) -> Self {
		message.into_value()
	}
}

impl From<Map<String, Value>> for Message {
	fn from(map: Map<String, Value>) -> Self {
		Self { inner: map }
	}
}

impl TryFrom<Value> for Message {
	type Error = ValidationError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		match value {
			Value::Object(map) => Ok(Self { inner: map }),
			_ => Err(ValidationError::NotAnObject),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use serde_json::json;

	#[test]
	fn test_new_message_is_empty() {
		let message = Message::new();
		assert!(message.is_empty());
		assert_eq!(message.len(), 0);
	}

	#[test]
	fn test_builders_use_wire_field_names() {
		let message = Message::new()
			.with_user_id("u1")
			.with_anonymous_id("a1")
			.with_event("Clicked")
			.with_name("Home")
			.with_message_id("m1");

		assert_eq!(message.get("userId"), Some(&json!("u1")));
		assert_eq!(message.get("anonymousId"), Some(&json!("a1")));
		assert_eq!(message.get("event"), Some(&json!("Clicked")));
		assert_eq!(message.get("name"), Some(&json!("Home")));
		assert_eq!(message.get("messageId"), Some(&json!("m1")));
	}

	#[test]
	fn test_user_id_keeps_non_string_values() {
		let message = Message::new().with_user_id(42);
		assert_eq!(message.get("userId"), Some(&json!(42)));
	}

	#[test]
	fn test_timestamp_is_formatted_with_millis() {
		let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
		let message = Message::new().with_timestamp(ts);
		assert_eq!(
			message.get("timestamp"),
			Some(&json!("2024-03-01T12:30:00.000Z"))
		);
	}

	#[test]
	fn test_merge_prefers_other() {
		let base = Message::new().insert("a", 1).insert("b", 2);
		let other = Message::new().insert("b", 3);
		let merged = base.merge(other);
		assert_eq!(merged.get("a"), Some(&json!(1)));
		assert_eq!(merged.get("b"), Some(&json!(3)));
	}

	#[test]
	fn test_try_from_rejects_non_objects() {
		assert_eq!(
			Message::try_from(json!([1, 2])),
			Err(ValidationError::NotAnObject)
		);
		assert_eq!(Message::try_from(json!("x")), Err(ValidationError::NotAnObject));

		let message = Message::try_from(json!({"userId": "u"})).unwrap();
		assert_eq!(message.len(), 1);
	}

	#[test]
	fn test_serializes_transparently() {
		let message = Message::new().with_user_id("u");
		assert_eq!(serde_json::to_value(&message).unwrap(), json!({"userId": "u"}));
	}
}
