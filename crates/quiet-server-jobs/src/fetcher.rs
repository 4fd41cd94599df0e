// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiet_server_db::{BlockStore, DbError, DueBlock};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::window::ReminderWindow;

/// A due block with a deliverable recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
	pub block_id: String,
	pub title: String,
	pub start_time: DateTime<Utc>,
	pub user_id: String,
	pub email: String,
	pub full_name: Option<String>,
}

/// A due block dropped for incomplete data. No attempt is recorded for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBlock {
	pub block_id: String,
	pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
	pub candidates: Vec<Candidate>,
	pub skipped: Vec<SkippedBlock>,
}

impl FetchOutcome {
	/// Rows returned by the store, deliverable or not.
	pub fn total(&self) -> usize {
		self.candidates.len() + self.skipped.len()
	}
}

pub struct CandidateFetcher {
	store: Arc<dyn BlockStore>,
}

impl CandidateFetcher {
	pub fn new(store: Arc<dyn BlockStore>) -> Self {
		Self { store }
	}

	/// Query due blocks. A store error is returned as-is and must abort the run.
	#[instrument(skip(self), fields(window_start = %window.start, window_end = %window.end))]
	pub async fn fetch(&self, window: &ReminderWindow) -> Result<FetchOutcome, DbError> {
		let rows = self.store.list_due_blocks(window.start, window.end).await?;

		let mut outcome = FetchOutcome::default();
		for row in rows {
			match into_candidate(row) {
				Ok(candidate) => outcome.candidates.push(candidate),
				Err(skipped) => {
					warn!(
						block_id = %skipped.block_id,
						reason = %skipped.reason,
						"skipping block with incomplete recipient data"
					);
					outcome.skipped.push(skipped);
				}
			}
		}
		Ok(outcome)
	}
}

fn into_candidate(row: DueBlock) -> Result<Candidate, SkippedBlock> {
	let email = match row.email.map(|e| e.trim().to_string()) {
		Some(email) if !email.is_empty() => email,
		_ => {
			return Err(SkippedBlock {
				block_id: row.id,
				reason: "owner has no email address".to_string(),
			})
		}
	};
	Ok(Candidate {
		block_id: row.id,
		title: row.title,
		start_time: row.start_time,
		user_id: row.user_id,
		email,
		full_name: row.full_name,
	})
}
