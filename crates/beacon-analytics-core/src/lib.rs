// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Beacon analytics.
//!
//! This crate describes what goes over the wire to the collection endpoint:
//! the caller-facing [`Message`] builder, the normalized [`Event`] and the
//! [`BatchPayload`] posted to `{host}/v1/batch`. It is shared by the client SDK
//! (`beacon-analytics`) and the configuration crate.
//!
//! # Example
//!
//! ```
//! use beacon_analytics_core::{Event, EventKind, Message, SystemClock, UuidGenerator};
//!
//! let message = Message::new()
//!     .with_user_id("user_123")
//!     .with_event("Wallet Created")
//!     .with_properties(serde_json::json!({"method": "srp"}));
//!
//! let event = Event::normalize(EventKind::Track, message, &SystemClock, &UuidGenerator).unwrap();
//! assert_eq!(event.library_name(), Some("analytics-node"));
//! ```

pub mod batch;
pub mod clock;
pub mod error;
pub mod event;
pub mod message;
pub mod validation;

use std::time::Duration;

pub use batch::BatchPayload;
pub use clock::{format_timestamp, Clock, IdGenerator, SystemClock, UuidGenerator};
pub use error::ValidationError;
pub use event::{Event, EventKind};
pub use message::Message;
pub use validation::validate;

/// Library name injected into every event's `context.library.name`.
pub const LIBRARY_NAME: &str = "analytics-node";

/// Default collection endpoint host.
pub const DEFAULT_HOST: &str = "https://api.segment.io";

/// Path of the batch endpoint, appended to the host.
pub const BATCH_PATH: &str = "/v1/batch";

/// Default number of queued events that triggers a flush.
pub const DEFAULT_FLUSH_AT: usize = 20;

/// Default delay before a timer-triggered flush.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Serialized size of queued events that forces a flush (450 KiB).
pub const MAX_QUEUE_SIZE_BYTES: usize = 450 * 1024;

/// Default number of retries after the initial send attempt.
pub const DEFAULT_RETRY_COUNT: u32 = 3;
