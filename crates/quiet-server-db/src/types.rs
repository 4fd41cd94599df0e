// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical timestamp encoding for stored instants.
///
/// Fixed-width RFC 3339 in UTC with millisecond precision, so lexicographic
/// order of the stored strings equals chronological order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
	at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A block whose reminder window has opened, joined with its owner's profile.
///
/// `email` and `full_name` come from the profile and may be absent; the
/// fetcher decides what to do with incomplete rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueBlock {
	pub id: String,
	pub title: String,
	pub start_time: DateTime<Utc>,
	pub user_id: String,
	pub email: Option<String>,
	pub full_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
	Sent,
	Failed,
}

impl NotificationStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			NotificationStatus::Sent => "sent",
			NotificationStatus::Failed => "failed",
		}
	}
}

impl std::str::FromStr for NotificationStatus {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"sent" => Ok(NotificationStatus::Sent),
			"failed" => Ok(NotificationStatus::Failed),
			_ => Err(format!("unknown notification status: {s}")),
		}
	}
}

/// One row of the append-only delivery log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAttempt {
	pub id: Uuid,
	pub block_id: String,
	pub user_id: String,
	pub user_email: String,
	pub status: NotificationStatus,
	pub attempted_at: DateTime<Utc>,
	#[serde(rename = "error_message")]
	pub error_detail: Option<String>,
}

impl NotificationAttempt {
	pub fn sent(
		block_id: impl Into<String>,
		user_id: impl Into<String>,
		user_email: impl Into<String>,
		attempted_at: DateTime<Utc>,
	) -> Self {
		Self {
			id: Uuid::new_v4(),
			block_id: block_id.into(),
			user_id: user_id.into(),
			user_email: user_email.into(),
			status: NotificationStatus::Sent,
			attempted_at,
			error_detail: None,
		}
	}

	pub fn failed(
		block_id: impl Into<String>,
		user_id: impl Into<String>,
		user_email: impl Into<String>,
		attempted_at: DateTime<Utc>,
		error: impl Into<String>,
	) -> Self {
		Self {
			id: Uuid::new_v4(),
			block_id: block_id.into(),
			user_id: user_id.into(),
			user_email: user_email.into(),
			status: NotificationStatus::Failed,
			attempted_at,
			error_detail: Some(error.into()),
		}
	}
}

/// Profile row used when seeding a local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
	pub id: String,
	pub email: Option<String>,
	pub full_name: Option<String>,
}

/// Block row used when seeding a local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlock {
	pub id: String,
	pub user_id: String,
	pub title: String,
	pub start_time: DateTime<Utc>,
	pub end_time: DateTime<Utc>,
	pub notified: bool,
}
