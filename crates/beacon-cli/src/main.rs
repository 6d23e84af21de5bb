// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! `beacon` - send analytics events from the command line.

use std::path::PathBuf;

use anyhow::{Context, Result};
use beacon_analytics::Analytics;
use clap::{Parser, Subcommand};

mod commands;
mod logging;

use commands::{EventArgs, EventCommand};

#[derive(Parser, Debug)]
#[command(name = "beacon", about = "Send analytics events to a batch collector", version)]
struct Args {
	/// Config file. Defaults to the user config directory.
	#[arg(long, global = true, env = "BEACON_CONFIG")]
	config: Option<PathBuf>,

	/// Log filter, e.g. `debug`. Overrides the configured level.
	#[arg(long, global = true)]
	log_level: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Associate a user with their traits
	Identify {
		#[command(flatten)]
		event: EventArgs,
	},
	/// Record an action the user performed
	Track {
		/// Event name, e.g. "Swap Completed"
		#[arg(long)]
		event: String,
		#[command(flatten)]
		fields: EventArgs,
	},
	/// Record a page view
	Page {
		/// Page name
		#[arg(long)]
		name: Option<String>,
		#[command(flatten)]
		fields: EventArgs,
	},
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let (command, message) = match args.command {
		Command::Version => {
			println!(
				"beacon {} ({})",
				env!("CARGO_PKG_VERSION"),
				beacon_analytics::LIBRARY_NAME
			);
			return Ok(());
		}
		Command::Identify { event } => (EventCommand::Identify, event.into_message()?),
		Command::Track { event, fields } => {
			(EventCommand::Track, fields.into_message()?.with_event(event))
		}
		Command::Page { name, fields } => {
			let mut message = fields.into_message()?;
			if let Some(name) = name {
				message = message.with_name(name);
			}
			(EventCommand::Page, message)
		}
	};

	let config = beacon_common_config::load_config(args.config).context("loading configuration")?;
	logging::init(args.log_level.as_deref().unwrap_or(&config.logging.level));

	let analytics = Analytics::builder()
		.config(&config.analytics)
		.build()
		.context("building analytics client")?;

	commands::send(&analytics, command, message).await
}
