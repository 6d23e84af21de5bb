// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading secrets from `VAR` or `VAR_FILE`.

use std::path::PathBuf;
use std::{env, fs};

use thiserror::Error;

use crate::secret::SecretString;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Loads a secret from `{var}_FILE` if set, otherwise from `{var}`.
///
/// A single trailing newline is stripped from file contents. Returns
/// `Ok(None)` when neither variable is set.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path) = env::var(&file_var) {
		if path.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(path);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;
		let value = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(value)));
	}

	Ok(env::var(var).ok().map(SecretString::new))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn test_returns_none_when_unset() {
		let var = "BEACON_TEST_SECRET_UNSET";
		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));
		assert!(load_secret_env(var).unwrap().is_none());
	}

	#[test]
	fn test_reads_direct_value() {
		let var = "BEACON_TEST_SECRET_DIRECT";
		env::set_var(var, "wk_direct");
		env::remove_var(format!("{var}_FILE"));

		assert_eq!(load_secret_env(var).unwrap().unwrap().expose(), "wk_direct");
		env::remove_var(var);
	}

	#[test]
	fn test_file_wins_and_strips_one_newline() {
		let var = "BEACON_TEST_SECRET_FILE";
		let mut file = NamedTempFile::new().unwrap();
		write!(file, "wk_file\n\n").unwrap();

		env::set_var(var, "wk_direct");
		env::set_var(format!("{var}_FILE"), file.path());

		assert_eq!(load_secret_env(var).unwrap().unwrap().expose(), "wk_file\n");

		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn test_missing_file_and_empty_path_are_errors() {
		let var = "BEACON_TEST_SECRET_BAD_FILE";
		env::set_var(format!("{var}_FILE"), "/nonexistent/beacon/write_key");
		assert!(matches!(load_secret_env(var), Err(SecretEnvError::Io { .. })));

		env::set_var(format!("{var}_FILE"), "");
		assert!(matches!(
			load_secret_env(var),
			Err(SecretEnvError::EmptyPath { .. })
		));

		env::remove_var(format!("{var}_FILE"));
	}
}
