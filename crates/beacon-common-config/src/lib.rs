// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for Beacon.
//!
//! This crate provides:
//! - [`Secret`], a redacting wrapper for the write key
//! - [`load_secret_env`] for the `VAR` / `VAR_FILE` convention
//! - Layered configuration from defaults, a TOML file and `BEACON_*` environment variables
//!
//! # Usage
//!
//! ```ignore
//! use beacon_common_config::load_config;
//!
//! // `None` reads the user config file when it exists.
//! let config = load_config(None)?;
//! println!("sending to {}", config.analytics.host);
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod secret;
pub mod sections;
pub mod sources;

pub use env::{load_secret_env, SecretEnvError};
pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use secret::{Secret, SecretString, REDACTED};
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeaconConfig {
	pub analytics: AnalyticsConfig,
	pub logging: LoggingConfig,
}

/// Load configuration with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`BEACON_*`)
/// 2. Config file: `config_path`, which must exist, or else the user config
///    file when present
/// 3. Built-in defaults
pub fn load_config(config_path: Option<PathBuf>) -> Result<BeaconConfig, ConfigError> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(DefaultsSource), Box::new(EnvSource)];

	match config_path.map(TomlSource::new).or_else(TomlSource::user) {
		Some(toml) => sources.push(Box::new(toml)),
		None => debug!("no config directory available, skipping config file"),
	}

	load_config_from(sources)
}

/// Merge `sources` in precedence order and resolve the result.
pub fn load_config_from(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<BeaconConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	Ok(finalize(merged))
}

fn finalize(layer: ConfigLayer) -> BeaconConfig {
	let analytics = layer.analytics.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		host = %analytics.host,
		flush_at = analytics.flush_at,
		flush_interval_ms = analytics.flush_interval.as_millis() as u64,
		retry_count = analytics.retry_count,
		enabled = analytics.enabled,
		write_key_configured = analytics.write_key.is_some(),
		"Configuration loaded"
	);

	BeaconConfig { analytics, logging }
}
