// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file and the environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, trace};

use crate::env::load_secret_env;
use crate::error::ConfigError;
use crate::layer::ConfigLayer;
use crate::sections::{AnalyticsConfigLayer, LoggingConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ConfigLayer::default())
	}
}

/// TOML file source.
pub struct TomlSource {
	path: PathBuf,
	required: bool,
}

impl TomlSource {
	/// A file the caller asked for explicitly. It must exist.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: true,
		}
	}

	/// A file that yields an empty layer when missing.
	pub fn optional(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: false,
		}
	}

	/// `$XDG_CONFIG_HOME/beacon/config.toml` (optional), or `None` when the
	/// platform has no config directory.
	pub fn user() -> Option<Self> {
		dirs::config_dir().map(|dir| Self::optional(dir.join("beacon").join("config.toml")))
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.required && !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `BEACON_<SECTION>_<FIELD>`. The write key also honours
/// `BEACON_ANALYTICS_WRITE_KEY_FILE`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ConfigLayer {
			analytics: Some(load_analytics_from_env()?),
			logging: Some(load_logging_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
	match env_var(name) {
		Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => Ok(Some(true)),
		Some(v) if v == "0" || v.eq_ignore_ascii_case("false") => Ok(Some(false)),
		Some(v) => Err(ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid boolean value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_parse<T: FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_analytics_from_env() -> Result<AnalyticsConfigLayer, ConfigError> {
	Ok(AnalyticsConfigLayer {
		write_key: load_secret_env("BEACON_ANALYTICS_WRITE_KEY")?,
		host: env_var("BEACON_ANALYTICS_HOST"),
		flush_at: env_parse("BEACON_ANALYTICS_FLUSH_AT", "usize")?,
		flush_interval_ms: env_parse("BEACON_ANALYTICS_FLUSH_INTERVAL_MS", "u64")?,
		max_queue_size_bytes: None,
		retry_count: env_parse("BEACON_ANALYTICS_RETRY_COUNT", "u32")?,
		request_timeout_secs: None,
		enabled: env_bool("BEACON_ANALYTICS_ENABLED")?,
	})
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("BEACON_LOG_LEVEL"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn test_precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_missing_optional_toml_file_is_empty_layer() {
		let source = TomlSource::optional("/nonexistent/beacon/config.toml");
		assert_eq!(source.load().unwrap(), ConfigLayer::default());
	}

	#[test]
	fn test_missing_explicit_toml_file_is_an_error() {
		let err = TomlSource::new("/nonexistent/beacon/config.toml")
			.load()
			.unwrap_err();
		assert!(matches!(
			err,
			ConfigError::FileRead { ref path, .. } if path.ends_with("beacon/config.toml")
		));
	}

	#[test]
	fn test_toml_file_is_parsed() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[analytics]
write_key = "wk_from_file"
host = "http://localhost:8080"
flush_at = 5

[logging]
level = "debug"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		let analytics = layer.analytics.unwrap();
		assert_eq!(analytics.write_key.unwrap().expose(), "wk_from_file");
		assert_eq!(analytics.host.as_deref(), Some("http://localhost:8080"));
		assert_eq!(analytics.flush_at, Some(5));
		assert_eq!(layer.logging.unwrap().level.as_deref(), Some("debug"));
	}

	#[test]
	fn test_malformed_toml_is_an_error() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "[analytics\nflush_at = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_user_source_path() {
		if let Some(source) = TomlSource::user() {
			assert!(source.path().ends_with("beacon/config.toml"));
		}
	}
}
