// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dispatch run tuning: reminder lead time, send attempts and parallelism.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_REMINDER_LEAD_SECS: u64 = 600;
pub const DEFAULT_MAX_SEND_ATTEMPTS: u32 = 3;
/// Upper bound on the reminder window width (one day).
pub const MAX_REMINDER_LEAD_SECS: u64 = 86_400;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DispatchConfigLayer {
	pub reminder_lead_secs: Option<u64>,
	pub max_send_attempts: Option<u32>,
	pub retry_delay_ms: Option<u64>,
	pub concurrency: Option<usize>,
	pub display_timezone: Option<String>,
}

impl DispatchConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.reminder_lead_secs.is_some() {
			self.reminder_lead_secs = other.reminder_lead_secs;
		}
		if other.max_send_attempts.is_some() {
			self.max_send_attempts = other.max_send_attempts;
		}
		if other.retry_delay_ms.is_some() {
			self.retry_delay_ms = other.retry_delay_ms;
		}
		if other.concurrency.is_some() {
			self.concurrency = other.concurrency;
		}
		if other.display_timezone.is_some() {
			self.display_timezone = other.display_timezone;
		}
	}

	pub fn finalize(self) -> Result<DispatchConfig, ConfigError> {
		let display_timezone = match self.display_timezone {
			Some(name) => name.parse::<Tz>().map_err(|e| ConfigError::InvalidValue {
				key: "dispatch.display_timezone".to_string(),
				message: e.to_string(),
			})?,
			None => Tz::UTC,
		};

		Ok(DispatchConfig {
			reminder_lead_secs: self
				.reminder_lead_secs
				.unwrap_or(DEFAULT_REMINDER_LEAD_SECS),
			max_send_attempts: self.max_send_attempts.unwrap_or(DEFAULT_MAX_SEND_ATTEMPTS),
			retry_delay_ms: self.retry_delay_ms.unwrap_or(0),
			concurrency: self.concurrency.unwrap_or(1),
			display_timezone,
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
	/// Width of the reminder window.
	pub reminder_lead_secs: u64,
	pub max_send_attempts: u32,
	pub retry_delay_ms: u64,
	/// Candidates processed at once; 1 keeps the run strictly sequential.
	pub concurrency: usize,
	pub display_timezone: Tz,
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			reminder_lead_secs: DEFAULT_REMINDER_LEAD_SECS,
			max_send_attempts: DEFAULT_MAX_SEND_ATTEMPTS,
			retry_delay_ms: 0,
			concurrency: 1,
			display_timezone: Tz::UTC,
		}
	}
}
