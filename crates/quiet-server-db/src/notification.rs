// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::types::{format_timestamp, NotificationAttempt};

/// Append-only delivery log.
#[async_trait]
pub trait NotificationStore: Send + Sync {
	async fn append_attempt(&self, attempt: &NotificationAttempt) -> Result<()>;
	async fn list_attempts_for_block(&self, block_id: &str) -> Result<Vec<NotificationAttempt>>;
}

type AttemptRow = (
	String,
	String,
	String,
	String,
	String,
	DateTime<Utc>,
	Option<String>,
);

#[derive(Clone)]
pub struct NotificationRepository {
	pool: SqlitePool,
}

impl NotificationRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, attempt), fields(block_id = %attempt.block_id, status = attempt.status.as_str()))]
	pub async fn append_attempt(&self, attempt: &NotificationAttempt) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO notifications (id, block_id, user_id, user_email, status, attempted_at, error_message)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(attempt.id.to_string())
		.bind(&attempt.block_id)
		.bind(&attempt.user_id)
		.bind(&attempt.user_email)
		.bind(attempt.status.as_str())
		.bind(format_timestamp(attempt.attempted_at))
		.bind(&attempt.error_detail)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_attempts_for_block(&self, block_id: &str) -> Result<Vec<NotificationAttempt>> {
		let rows = sqlx::query_as::<_, AttemptRow>(
			r#"
			SELECT id, block_id, user_id, user_email, status, attempted_at, error_message
			FROM notifications
			WHERE block_id = ?
			ORDER BY attempted_at, id
			"#,
		)
		.bind(block_id)
		.fetch_all(&self.pool)
		.await?;

		rows
			.into_iter()
			.map(
				|(id, block_id, user_id, user_email, status, attempted_at, error_detail)| {
					Ok(NotificationAttempt {
						id: Uuid::parse_str(&id).map_err(|e| DbError::Decode(e.to_string()))?,
						block_id,
						user_id,
						user_email,
						status: status.parse().map_err(DbError::Decode)?,
						attempted_at,
						error_detail,
					})
				},
			)
			.collect()
	}
}

#[async_trait]
impl NotificationStore for NotificationRepository {
	async fn append_attempt(&self, attempt: &NotificationAttempt) -> Result<()> {
		self.append_attempt(attempt).await
	}

	async fn list_attempts_for_block(&self, block_id: &str) -> Result<Vec<NotificationAttempt>> {
		self.list_attempts_for_block(block_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::block::BlockRepository;
	use crate::testing::create_test_pool;
	use crate::types::{NewBlock, NewProfile, NotificationStatus};
	use chrono::{Duration, TimeZone};

	async fn setup() -> (NotificationRepository, DateTime<Utc>) {
		let pool = create_test_pool().await;
		let blocks = BlockRepository::new(pool.clone());
		let start = Utc.with_ymd_and_hms(2025, 6, 2, 14, 5, 0).unwrap();
		blocks
			.insert_profile(&NewProfile {
				id: "u1".to_string(),
				email: Some("ada@example.com".to_string()),
				full_name: Some("Ada".to_string()),
			})
			.await
			.unwrap();
		blocks
			.insert_block(&NewBlock {
				id: "b1".to_string(),
				user_id: "u1".to_string(),
				title: "Deep work".to_string(),
				start_time: start,
				end_time: start + Duration::hours(1),
				notified: false,
			})
			.await
			.unwrap();
		(NotificationRepository::new(pool), start)
	}

	#[tokio::test]
	async fn test_append_and_list_in_order() {
		let (repo, start) = setup().await;
		let first = start - Duration::minutes(10);
		let second = start - Duration::minutes(5);

		repo.append_attempt(&NotificationAttempt::failed(
			"b1",
			"u1",
			"ada@example.com",
			first,
			"Resend returned 503",
		))
		.await
		.unwrap();
		repo.append_attempt(&NotificationAttempt::sent(
			"b1",
			"u1",
			"ada@example.com",
			second,
		))
		.await
		.unwrap();

		let attempts = repo.list_attempts_for_block("b1").await.unwrap();
		assert_eq!(attempts.len(), 2);
		assert_eq!(attempts[0].status, NotificationStatus::Failed);
		assert_eq!(attempts[0].error_detail.as_deref(), Some("Resend returned 503"));
		assert_eq!(attempts[0].attempted_at, first);
		assert_eq!(attempts[1].status, NotificationStatus::Sent);
		assert!(attempts[1].error_detail.is_none());
	}

	#[tokio::test]
	async fn test_attempt_for_unknown_block_is_rejected() {
		let (repo, start) = setup().await;
		let result = repo
			.append_attempt(&NotificationAttempt::sent(
				"missing",
				"u1",
				"ada@example.com",
				start,
			))
			.await;
		assert!(matches!(result, Err(DbError::Sqlx(_))));
	}

	#[tokio::test]
	async fn test_duplicate_id_is_rejected() {
		let (repo, start) = setup().await;
		let attempt = NotificationAttempt::sent("b1", "u1", "ada@example.com", start);
		repo.append_attempt(&attempt).await.unwrap();
		assert!(repo.append_attempt(&attempt).await.is_err());
		assert_eq!(repo.list_attempts_for_block("b1").await.unwrap().len(), 1);
	}
}
