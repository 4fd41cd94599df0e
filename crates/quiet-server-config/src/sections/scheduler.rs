// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process scheduler configuration.

use serde::{Deserialize, Serialize};

const DEFAULT_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfigLayer {
	pub enabled: Option<bool>,
	pub interval_secs: Option<u64>,
}

impl SchedulerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.interval_secs.is_some() {
			self.interval_secs = other.interval_secs;
		}
	}

	pub fn finalize(self) -> SchedulerConfig {
		SchedulerConfig {
			enabled: self.enabled.unwrap_or(false),
			interval_secs: self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS),
		}
	}
}

/// When enabled the server runs the dispatch job itself on a fixed interval
/// instead of waiting for the external trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
	pub enabled: bool,
	pub interval_secs: u64,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		SchedulerConfigLayer::default().finalize()
	}
}
