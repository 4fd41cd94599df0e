// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiet_server_db::{BlockStore, DbError, NotificationAttempt, NotificationStore};
use quiet_server_email::DispatchResult;
use tracing::{debug, instrument};

use crate::fetcher::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
	/// `flipped` is false when another run had already set `notified`.
	Sent { flipped: bool },
	Failed,
}

/// Persists dispatch outcomes: the `notified` compare-and-set and the
/// append-only attempt log.
pub struct OutcomeRecorder {
	blocks: Arc<dyn BlockStore>,
	log: Arc<dyn NotificationStore>,
}

impl OutcomeRecorder {
	pub fn new(blocks: Arc<dyn BlockStore>, log: Arc<dyn NotificationStore>) -> Self {
		Self { blocks, log }
	}

	/// Record one candidate's result.
	///
	/// On `Sent` both writes are attempted even if the first fails; the first
	/// error is returned. `Failed` never touches `notified`.
	#[instrument(skip(self, candidate, result), fields(block_id = %candidate.block_id, sent = result.is_sent()))]
	pub async fn record(
		&self,
		candidate: &Candidate,
		result: &DispatchResult,
		attempted_at: DateTime<Utc>,
	) -> Result<RecordOutcome, DbError> {
		match result {
			DispatchResult::Sent { .. } => {
				let flipped = self.blocks.mark_notified(&candidate.block_id).await;
				let attempt = NotificationAttempt::sent(
					&candidate.block_id,
					&candidate.user_id,
					&candidate.email,
					attempted_at,
				);
				let appended = self.log.append_attempt(&attempt).await;

				let flipped = flipped?;
				appended?;
				if !flipped {
					debug!("block was already marked notified by another run");
				}
				Ok(RecordOutcome::Sent { flipped })
			}
			DispatchResult::Failed { error, .. } => {
				let attempt = NotificationAttempt::failed(
					&candidate.block_id,
					&candidate.user_id,
					&candidate.email,
					attempted_at,
					error.as_str(),
				);
				self.log.append_attempt(&attempt).await?;
				Ok(RecordOutcome::Failed)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{due_block, MemoryStore};
	use chrono::Duration;
	use quiet_server_db::NotificationStatus;

	fn candidate(store: &MemoryStore) -> Candidate {
		let block = due_block("b1", Utc::now() + Duration::minutes(5), Some("ada@example.com"));
		store.insert(block.clone());
		Candidate {
			block_id: block.id,
			title: block.title,
			start_time: block.start_time,
			user_id: block.user_id,
			email: "ada@example.com".to_string(),
			full_name: None,
		}
	}

	fn sent() -> DispatchResult {
		DispatchResult::Sent {
			attempts: 1,
			provider_message_id: None,
		}
	}

	#[tokio::test]
	async fn test_sent_flips_and_logs() {
		let store = Arc::new(MemoryStore::new());
		let candidate = candidate(&store);
		let recorder = OutcomeRecorder::new(store.clone(), store.clone());

		let outcome = recorder.record(&candidate, &sent(), Utc::now()).await.unwrap();
		assert_eq!(outcome, RecordOutcome::Sent { flipped: true });
		assert!(store.is_notified("b1"));

		let attempts = store.attempts_for("b1");
		assert_eq!(attempts.len(), 1);
		assert_eq!(attempts[0].status, NotificationStatus::Sent);
		assert_eq!(attempts[0].user_email, "ada@example.com");
	}

	#[tokio::test]
	async fn test_already_flipped_is_noop_not_error() {
		let store = Arc::new(MemoryStore::new());
		let candidate = candidate(&store);
		let recorder = OutcomeRecorder::new(store.clone(), store.clone());

		recorder.record(&candidate, &sent(), Utc::now()).await.unwrap();
		let second = recorder.record(&candidate, &sent(), Utc::now()).await.unwrap();
		assert_eq!(second, RecordOutcome::Sent { flipped: false });
		assert!(store.is_notified("b1"));
	}

	#[tokio::test]
	async fn test_failed_leaves_flag_and_logs_error() {
		let store = Arc::new(MemoryStore::new());
		let candidate = candidate(&store);
		let recorder = OutcomeRecorder::new(store.clone(), store.clone());

		let failed = DispatchResult::Failed {
			attempts: 3,
			error: "email provider rejected message: 503 down".to_string(),
		};
		let outcome = recorder.record(&candidate, &failed, Utc::now()).await.unwrap();
		assert_eq!(outcome, RecordOutcome::Failed);
		assert!(!store.is_notified("b1"));

		let attempts = store.attempts_for("b1");
		assert_eq!(attempts.len(), 1);
		assert_eq!(attempts[0].status, NotificationStatus::Failed);
		assert_eq!(
			attempts[0].error_detail.as_deref(),
			Some("email provider rejected message: 503 down")
		);
	}

	#[tokio::test]
	async fn test_write_failure_is_returned() {
		let store = Arc::new(MemoryStore::new());
		let candidate = candidate(&store);
		store.fail_writes();
		let recorder = OutcomeRecorder::new(store.clone(), store.clone());

		assert!(recorder.record(&candidate, &sent(), Utc::now()).await.is_err());
	}
}
