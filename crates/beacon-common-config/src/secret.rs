// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrapper for write keys and other credentials.
//!
//! [`Secret<T>`] keeps a value out of logs and config dumps:
//!
//! - `Debug`, `Display` and `Serialize` all print `[REDACTED]`
//! - the value is zeroized on drop
//! - callers must call `.expose()` to read it
//!
//! ```
//! use beacon_common_config::Secret;
//!
//! let write_key = Secret::new("wk_live_123".to_string());
//! assert_eq!(format!("{write_key}"), "[REDACTED]");
//! assert_eq!(write_key.expose(), "wk_live_123");
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Placeholder printed instead of a secret value.
pub const REDACTED: &str = "[REDACTED]";

#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Reads the wrapped value. Every call site is a deliberate disclosure.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl SecretString {
	/// True for an empty or whitespace-only string.
	pub fn is_blank(&self) -> bool {
		self.inner.trim().is_empty()
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value.to_string())
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

impl<T> Serialize for Secret<T>
where
	T: Zeroize,
{
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de, T> Deserialize<'de> for Secret<T>
where
	T: Deserialize<'de> + Zeroize,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		T::deserialize(deserializer).map(Secret::new)
	}
}
