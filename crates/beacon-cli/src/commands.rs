// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Event subcommands.

use anyhow::{bail, Context, Result};
use beacon_analytics::{Analytics, Delivery, Message};
use clap::Args;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::info;

/// Fields shared by every event subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct EventArgs {
	/// Known user id.
	#[arg(long)]
	pub user_id: Option<String>,

	/// Anonymous id for users that are not yet known.
	#[arg(long)]
	pub anonymous_id: Option<String>,

	/// Properties as a JSON object.
	#[arg(long)]
	pub properties: Option<String>,

	/// Traits as a JSON object.
	#[arg(long)]
	pub traits: Option<String>,

	/// Context as a JSON object.
	#[arg(long)]
	pub context: Option<String>,

	/// Explicit message id. Generated when omitted.
	#[arg(long)]
	pub message_id: Option<String>,
}

impl EventArgs {
	pub fn into_message(self) -> Result<Message> {
		let mut message = Message::new();
		if let Some(user_id) = self.user_id {
			message = message.with_user_id(user_id);
		}
		if let Some(anonymous_id) = self.anonymous_id {
			message = message.with_anonymous_id(anonymous_id);
		}
		if let Some(properties) = self.properties {
			message = message.with_properties(parse_object("--properties", &properties)?);
		}
		if let Some(traits) = self.traits {
			message = message.with_traits(parse_object("--traits", &traits)?);
		}
		if let Some(context) = self.context {
			message = message.with_context(parse_object("--context", &context)?);
		}
		if let Some(message_id) = self.message_id {
			message = message.with_message_id(message_id);
		}
		Ok(message)
	}
}

fn parse_object(flag: &str, raw: &str) -> Result<Value> {
	let value: Value =
		serde_json::from_str(raw).with_context(|| format!("{flag} is not valid JSON"))?;
	if !value.is_object() {
		bail!("{flag} must be a JSON object");
	}
	Ok(value)
}

#[derive(Debug, Clone, Copy)]
pub enum EventCommand {
	Identify,
	Track,
	Page,
}

/// Enqueues one event, drains the client and reports the delivery.
pub async fn send(analytics: &Analytics, command: EventCommand, message: Message) -> Result<()> {
	let (tx, rx) = oneshot::channel();
	let callback = move |delivery: Delivery| {
		let _ = tx.send(delivery);
	};

	match command {
		EventCommand::Identify => analytics.identify_with(message, callback),
		EventCommand::Track => analytics.track_with(message, callback),
		EventCommand::Page => analytics.page_with(message, callback),
	}
	.context("event rejected")?;

	analytics.shutdown().await;

	let delivery = rx.await.context("delivery outcome was lost")?;
	if let Some(err) = delivery.error {
		bail!("delivery failed: {err}");
	}

	match delivery.batch {
		Some(batch) => info!(events = batch.len(), "event delivered"),
		None => info!("analytics disabled, event discarded"),
	}
	Ok(())
}
