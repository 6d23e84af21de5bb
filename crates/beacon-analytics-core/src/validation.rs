// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shape checks applied to a message before it is queued.

use chrono::DateTime;
use serde_json::Value;

use crate::error::ValidationError;
use crate::event::EventKind;
use crate::message::{
	Message, ANONYMOUS_ID, CONTEXT, EVENT, MESSAGE_ID, PROPERTIES, TIMESTAMP, TRAITS, USER_ID,
};

/// Checks that `message` has the shape required for `kind`.
///
/// - every kind needs a `userId` or an `anonymousId`
/// - `track` needs a string `event`
/// - `context`, `properties` and `traits` must be objects when present
/// - `timestamp` must be an RFC 3339 string when present
/// - `messageId` must be a string when present
///
/// Null fields count as absent.
pub fn validate(kind: EventKind, message: &Message) -> Result<(), ValidationError> {
	if !has_identity(message.get(USER_ID)) && !has_identity(message.get(ANONYMOUS_ID)) {
		return Err(ValidationError::MissingIdentity);
	}

	expect_object(message, CONTEXT)?;

	if let Some(ts) = present(message.get(TIMESTAMP)) {
		let valid = ts
			.as_str()
			.map(|s| DateTime::parse_from_rfc3339(s).is_ok())
			.unwrap_or(false);
		if !valid {
			return Err(ValidationError::InvalidField {
				field: TIMESTAMP,
				expected: "an RFC 3339 date string",
			});
		}
	}

	if let Some(id) = present(message.get(MESSAGE_ID)) {
		if !id.is_string() {
			return Err(ValidationError::InvalidField {
				field: MESSAGE_ID,
				expected: "a string",
			});
		}
	}

	match kind {
		EventKind::Track => {
			match present(message.get(EVENT)) {
				None => return Err(ValidationError::MissingEvent),
				Some(Value::String(s)) if s.is_empty() => return Err(ValidationError::MissingEvent),
				Some(Value::String(_)) => {}
				Some(_) => {
					return Err(ValidationError::InvalidField {
						field: EVENT,
						expected: "a string",
					})
				}
			}
			expect_object(message, PROPERTIES)?;
		}
		EventKind::Page => expect_object(message, PROPERTIES)?,
		EventKind::Identify => expect_object(message, TRAITS)?,
	}

	Ok(())
}

fn present(value: Option<&Value>) -> Option<&Value> {
	value.filter(|v| !v.is_null())
}

fn has_identity(value: Option<&Value>) -> bool {
	match present(value) {
		None => false,
		Some(Value::String(s)) => !s.is_empty(),
		Some(Value::Bool(b)) => *b,
		Some(_) => true,
	}
}

fn expect_object(message: &Message, field: &'static str) -> Result<(), ValidationError> {
	match present(message.get(field)) {
		Some(value) if !value.is_object() => Err(ValidationError::InvalidField {
			field,
			expected: "an object",
		}),
		_ => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	fn identified() -> Message {
		Message::new().with_user_id("user_123")
	}

	#[test]
	fn test_all_kinds_require_identity() {
		for kind in [EventKind::Identify, EventKind::Track, EventKind::Page] {
			let message = Message::new().with_event("Clicked");
			assert_eq!(validate(kind, &message), Err(ValidationError::MissingIdentity));
		}
	}

	#[test]
	fn test_null_and_empty_identity_are_missing() {
		let message = Message::new().insert("userId", Value::Null).with_anonymous_id("");
		assert_eq!(
			validate(EventKind::Identify, &message),
			Err(ValidationError::MissingIdentity)
		);
	}

	#[test]
	fn test_anonymous_id_alone_is_enough() {
		let message = Message::new().with_anonymous_id("anon");
		assert!(validate(EventKind::Page, &message).is_ok());
		assert!(validate(EventKind::Identify, &message).is_ok());
	}

	#[test]
	fn test_numeric_identity_is_accepted() {
		let message = Message::new().with_user_id(0);
		assert!(validate(EventKind::Identify, &message).is_ok());
	}

	#[test]
	fn test_track_requires_event() {
		assert_eq!(
			validate(EventKind::Track, &identified()),
			Err(ValidationError::MissingEvent)
		);
		assert_eq!(
			validate(EventKind::Track, &identified().with_event("")),
			Err(ValidationError::MissingEvent)
		);
		assert!(validate(EventKind::Track, &identified().with_event("Clicked")).is_ok());
	}

	#[test]
	fn test_track_event_must_be_string() {
		let message = identified().insert("event", 7);
		assert!(matches!(
			validate(EventKind::Track, &message),
			Err(ValidationError::InvalidField { field: "event", .. })
		));
	}

	#[test]
	fn test_page_does_not_require_event() {
		assert!(validate(EventKind::Page, &identified()).is_ok());
	}

	#[test]
	fn test_context_must_be_object() {
		let message = identified().with_context(json!("nope"));
		assert!(matches!(
			validate(EventKind::Identify, &message),
			Err(ValidationError::InvalidField { field: "context", .. })
		));
	}

	#[test]
	fn test_properties_and_traits_must_be_objects() {
		let track = identified().with_event("e").with_properties(json!([1]));
		assert!(matches!(
			validate(EventKind::Track, &track),
			Err(ValidationError::InvalidField { field: "properties", .. })
		));

		let identify = identified().with_traits(json!(3));
		assert!(matches!(
			validate(EventKind::Identify, &identify),
			Err(ValidationError::InvalidField { field: "traits", .. })
		));
	}

	#[test]
	fn test_timestamp_must_be_rfc3339() {
		let bad = identified().insert("timestamp", "yesterday");
		assert!(matches!(
			validate(EventKind::Identify, &bad),
			Err(ValidationError::InvalidField { field: "timestamp", .. })
		));

		let good = identified().insert("timestamp", "2024-01-01T00:00:00.000Z");
		assert!(validate(EventKind::Identify, &good).is_ok());
	}

	#[test]
	fn test_message_id_must_be_string() {
		let bad = identified().insert("messageId", 12);
		assert!(matches!(
			validate(EventKind::Identify, &bad),
			Err(ValidationError::InvalidField { field: "messageId", .. })
		));
	}

	proptest! {
		#[test]
		fn any_non_empty_user_id_passes_identify(user_id in "[a-zA-Z0-9_]{1,64}") {
			let message = Message::new().with_user_id(user_id);
			prop_assert!(validate(EventKind::Identify, &message).is_ok());
		}

		#[test]
		fn track_with_identity_and_event_passes(
			anon in "[a-f0-9]{8,32}",
			event in "[A-Za-z ]{1,40}",
		) {
			let message = Message::new().with_anonymous_id(anon).with_event(event);
			prop_assert!(validate(EventKind::Track, &message).is_ok());
		}
	}
}
