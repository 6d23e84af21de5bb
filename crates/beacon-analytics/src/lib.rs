// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batching analytics client for Beacon.
//!
//! Events are validated and normalized when they are enqueued, buffered in
//! memory, and posted in batches to `{host}/v1/batch`. Failed sends are retried
//! with exponential backoff for transient errors only.
//!
//! # Quick Start
//!
//! ```ignore
//! use beacon_analytics::{Analytics, Message};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let analytics = Analytics::builder()
//!         .write_key("wk_live_xxx")
//!         .flush_at(20)
//!         .build()?;
//!
//!     analytics
//!         .identify(Message::new().with_user_id("user_123").with_traits(json!({"plan": "pro"})))?
//!         .track_with(
//!             Message::new().with_user_id("user_123").with_event("Checkout Started"),
//!             |delivery| {
//!                 if let Some(err) = delivery.error {
//!                     eprintln!("event dropped: {err}");
//!                 }
//!             },
//!         )?;
//!
//!     // Sends anything still queued before exit.
//!     analytics.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Flushing
//!
//! Every enqueue checks, in order:
//!
//! 1. the very first event on a client is sent immediately
//! 2. reaching `flush_at` queued events, or the byte ceiling, sends a batch
//! 3. otherwise a one-shot timer of `flush_interval` is armed if none is pending
//!
//! [`Analytics::flush`] sends up to `flush_at` events at once and returns a
//! [`FlushHandle`] that resolves with the batch outcome.
//!
//! # Callbacks
//!
//! Each event's callback fires exactly once, after its batch succeeded or
//! failed for good, and never from inside the call that enqueued it. Events
//! of a failed batch are dropped.
//!
//! # Disabled mode
//!
//! A client built with `.enabled(false)` still validates messages but
//! performs no I/O and reports success to every callback.

mod batch;
mod client;
mod delivery;
mod error;
mod transport;

pub use client::{Analytics, AnalyticsBuilder};
pub use delivery::{Callback, Delivery, FlushHandle};
pub use error::{AnalyticsError, Result};
pub use transport::{basic_authorization, BatchRequest, HttpTransport, Transport};

pub use beacon_analytics_core::{
	BatchPayload, Clock, Event, EventKind, IdGenerator, Message, SystemClock, UuidGenerator,
	ValidationError, LIBRARY_NAME,
};
pub use beacon_common_http::RetryPolicy;
