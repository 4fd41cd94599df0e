// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How far ahead of a block's start the reminder goes out.
pub const REMINDER_LEAD: Duration = Duration::minutes(10);

/// Half-open interval `[start, end)` of block start times due for a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReminderWindow {
	pub start: DateTime<Utc>,
	pub end: DateTime<Utc>,
}

impl ReminderWindow {
	/// The window opening at `now` with the standard lead.
	pub fn at(now: DateTime<Utc>) -> Self {
		Self::with_lead(now, REMINDER_LEAD)
	}

	/// The end saturates at the latest representable instant.
	pub fn with_lead(now: DateTime<Utc>, lead: Duration) -> Self {
		Self {
			start: now,
			end: now
				.checked_add_signed(lead)
				.unwrap_or(DateTime::<Utc>::MAX_UTC),
		}
	}

	pub fn contains(&self, instant: DateTime<Utc>) -> bool {
		self.start <= instant && instant < self.end
	}
}
