// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod analytics;
mod logging;

pub use analytics::{AnalyticsConfig, AnalyticsConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
