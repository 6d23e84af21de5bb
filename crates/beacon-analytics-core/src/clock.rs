// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Time and identifier sources used when normalizing events.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Source of the current time for `timestamp` and `sentAt` defaults.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;
}

/// Source of default `messageId` values.
pub trait IdGenerator: Send + Sync {
	fn message_id(&self) -> String;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// Generates `node-<uuid v4>` message ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
	fn message_id(&self) -> String {
		format!("node-{}", Uuid::new_v4())
	}
}

/// Formats a timestamp as ISO 8601 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use std::collections::HashSet;

	#[test]
	fn test_format_timestamp() {
		let ts = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
		assert_eq!(format_timestamp(ts), "2023-12-31T23:59:59.000Z");
	}

	#[test]
	fn test_uuid_generator_prefix_and_uniqueness() {
		let ids: HashSet<String> = (0..1000).map(|_| UuidGenerator.message_id()).collect();
		assert_eq!(ids.len(), 1000);
		assert!(ids.iter().all(|id| id.starts_with("node-")));
	}
}
