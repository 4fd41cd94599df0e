// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared-secret configuration for the HTTP trigger.

use quiet_common_secret::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerConfigLayer {
	#[serde(skip_serializing)]
	pub cron_secret: Option<SecretString>,
}

impl TriggerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.cron_secret.is_some() {
			self.cron_secret = other.cron_secret;
		}
	}

	pub fn finalize(self) -> Result<TriggerConfig, ConfigError> {
		let cron_secret = self
			.cron_secret
			.ok_or_else(|| ConfigError::Missing("trigger.cron_secret".to_string()))?;
		if cron_secret.is_blank() {
			return Err(ConfigError::Validation(
				"trigger.cron_secret must not be empty".to_string(),
			));
		}
		Ok(TriggerConfig { cron_secret })
	}
}

#[derive(Debug, Clone)]
pub struct TriggerConfig {
	pub cron_secret: SecretString,
}
