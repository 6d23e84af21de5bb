// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Reasons a message is rejected before it is queued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("message must be a JSON object")]
	NotAnObject,

	#[error("you must pass either an anonymousId or a userId")]
	MissingIdentity,

	#[error("track events require an event name")]
	MissingEvent,

	#[error("{field} must be {expected}")]
	InvalidField {
		field: &'static str,
		expected: &'static str,
	},
}
