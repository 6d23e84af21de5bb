// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{AnalyticsConfigLayer, LoggingConfigLayer};

/// One source's view of the configuration. Unset sections stay `None`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ConfigLayer {
	#[serde(default)]
	pub analytics: Option<AnalyticsConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(
			&mut self.analytics,
			other.analytics,
			AnalyticsConfigLayer::merge,
		);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T>(base: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(b), Some(o)) => merge(b, o),
		(None, Some(o)) => *base = Some(o),
		_ => {}
	}
}
