// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::types::{format_timestamp, DueBlock, NewBlock, NewProfile};

/// Read and conditionally update blocks.
#[async_trait]
pub trait BlockStore: Send + Sync {
	/// Blocks with `notified = false` and `window_start <= start_time < window_end`,
	/// joined with the owner's email and display name.
	async fn list_due_blocks(
		&self,
		window_start: DateTime<Utc>,
		window_end: DateTime<Utc>,
	) -> Result<Vec<DueBlock>>;

	/// Flip `notified` from false to true. Returns `false` when the flag was
	/// already set, which callers treat as a no-op.
	async fn mark_notified(&self, block_id: &str) -> Result<bool>;

	/// Cheap reachability check for health reporting.
	async fn ping(&self) -> Result<()>;
}

type DueBlockRow = (
	String,
	String,
	DateTime<Utc>,
	String,
	Option<String>,
	Option<String>,
);

#[derive(Clone)]
pub struct BlockRepository {
	pool: SqlitePool,
}

impl BlockRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_due_blocks(
		&self,
		window_start: DateTime<Utc>,
		window_end: DateTime<Utc>,
	) -> Result<Vec<DueBlock>> {
		let rows = sqlx::query_as::<_, DueBlockRow>(
			r#"
			SELECT b.id, b.title, b.start_time, b.user_id, p.email, p.full_name
			FROM blocks b
			LEFT JOIN profiles p ON p.id = b.user_id
			WHERE b.notified = 0
			  AND b.start_time >= ?
			  AND b.start_time < ?
			ORDER BY b.start_time, b.id
			"#,
		)
		.bind(format_timestamp(window_start))
		.bind(format_timestamp(window_end))
		.fetch_all(&self.pool)
		.await?;

		Ok(
			rows
				.into_iter()
				.map(
					|(id, title, start_time, user_id, email, full_name)| DueBlock {
						id,
						title,
						start_time,
						user_id,
						email,
						full_name,
					},
				)
				.collect(),
		)
	}

	#[tracing::instrument(skip(self), fields(block_id = %block_id))]
	pub async fn mark_notified(&self, block_id: &str) -> Result<bool> {
		let result = sqlx::query("UPDATE blocks SET notified = 1 WHERE id = ? AND notified = 0")
			.bind(block_id)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() == 1)
	}

	#[tracing::instrument(skip(self))]
	pub async fn is_notified(&self, block_id: &str) -> Result<Option<bool>> {
		let row: Option<(bool,)> = sqlx::query_as("SELECT notified FROM blocks WHERE id = ?")
			.bind(block_id)
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.map(|(notified,)| notified))
	}

	#[tracing::instrument(skip(self, profile), fields(profile_id = %profile.id))]
	pub async fn insert_profile(&self, profile: &NewProfile) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO profiles (id, email, full_name)
			VALUES (?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				email = excluded.email,
				full_name = excluded.full_name
			"#,
		)
		.bind(&profile.id)
		.bind(&profile.email)
		.bind(&profile.full_name)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self, block), fields(block_id = %block.id))]
	pub async fn insert_block(&self, block: &NewBlock) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO blocks (id, user_id, title, start_time, end_time, notified, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&block.id)
		.bind(&block.user_id)
		.bind(&block.title)
		.bind(format_timestamp(block.start_time))
		.bind(format_timestamp(block.end_time))
		.bind(block.notified)
		.bind(format_timestamp(Utc::now()))
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	pub async fn ping(&self) -> Result<()> {
		sqlx::query("SELECT 1").execute(&self.pool).await?;
		Ok(())
	}
}

#[async_trait]
impl BlockStore for BlockRepository {
	async fn list_due_blocks(
		&self,
		window_start: DateTime<Utc>,
		window_end: DateTime<Utc>,
	) -> Result<Vec<DueBlock>> {
		self.list_due_blocks(window_start, window_end).await
	}

	async fn mark_notified(&self, block_id: &str) -> Result<bool> {
		self.mark_notified(block_id).await
	}

	async fn ping(&self) -> Result<()> {
		self.ping().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use chrono::{Duration, TimeZone};

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2025, 6, 2, 14, 0, 0).unwrap()
	}

	fn block(id: &str, user_id: &str, offset: Duration, notified: bool) -> NewBlock {
		NewBlock {
			id: id.to_string(),
			user_id: user_id.to_string(),
			title: format!("Block {id}"),
			start_time: now() + offset,
			end_time: now() + offset + Duration::hours(1),
			notified,
		}
	}

	async fn seeded_repo() -> BlockRepository {
		let repo = BlockRepository::new(create_test_pool().await);
		repo
			.insert_profile(&NewProfile {
				id: "u1".to_string(),
				email: Some("ada@example.com".to_string()),
				full_name: Some("Ada".to_string()),
			})
			.await
			.unwrap();
		repo
			.insert_profile(&NewProfile {
				id: "u2".to_string(),
				email: None,
				full_name: None,
			})
			.await
			.unwrap();
		repo
	}

	#[tokio::test]
	async fn test_window_is_half_open() {
		let repo = seeded_repo().await;
		repo.insert_block(&block("at-start", "u1", Duration::zero(), false))
			.await
			.unwrap();
		repo.insert_block(&block("inside", "u1", Duration::minutes(9), false))
			.await
			.unwrap();
		repo.insert_block(&block("at-end", "u1", Duration::minutes(10), false))
			.await
			.unwrap();
		repo.insert_block(&block("later", "u1", Duration::minutes(15), false))
			.await
			.unwrap();
		repo.insert_block(&block("past", "u1", Duration::minutes(-1), false))
			.await
			.unwrap();

		let due = repo
			.list_due_blocks(now(), now() + Duration::minutes(10))
			.await
			.unwrap();
		let mut ids: Vec<_> = due.iter().map(|b| b.id.as_str()).collect();
		ids.sort();
		assert_eq!(ids, vec!["at-start", "inside"]);
	}

	#[tokio::test]
	async fn test_notified_blocks_are_not_candidates() {
		let repo = seeded_repo().await;
		repo.insert_block(&block("done", "u1", Duration::minutes(5), true))
			.await
			.unwrap();
		let due = repo
			.list_due_blocks(now(), now() + Duration::minutes(10))
			.await
			.unwrap();
		assert!(due.is_empty());
	}

	#[tokio::test]
	async fn test_join_carries_profile_fields() {
		let repo = seeded_repo().await;
		repo.insert_block(&block("b1", "u1", Duration::minutes(3), false))
			.await
			.unwrap();
		repo.insert_block(&block("b2", "u2", Duration::minutes(4), false))
			.await
			.unwrap();

		let due = repo
			.list_due_blocks(now(), now() + Duration::minutes(10))
			.await
			.unwrap();
		let b1 = due.iter().find(|b| b.id == "b1").unwrap();
		assert_eq!(b1.email.as_deref(), Some("ada@example.com"));
		assert_eq!(b1.full_name.as_deref(), Some("Ada"));
		assert_eq!(b1.start_time, now() + Duration::minutes(3));

		let b2 = due.iter().find(|b| b.id == "b2").unwrap();
		assert!(b2.email.is_none());
	}

	#[tokio::test]
	async fn test_mark_notified_flips_once() {
		let repo = seeded_repo().await;
		repo.insert_block(&block("b1", "u1", Duration::minutes(3), false))
			.await
			.unwrap();

		assert!(repo.mark_notified("b1").await.unwrap());
		assert!(!repo.mark_notified("b1").await.unwrap());
		assert_eq!(repo.is_notified("b1").await.unwrap(), Some(true));
	}

	#[tokio::test]
	async fn test_concurrent_flips_have_one_winner() {
		let repo = seeded_repo().await;
		repo.insert_block(&block("b1", "u1", Duration::minutes(3), false))
			.await
			.unwrap();

		let (a, b) = tokio::join!(repo.mark_notified("b1"), repo.mark_notified("b1"));
		let wins = [a.unwrap(), b.unwrap()].iter().filter(|w| **w).count();
		assert_eq!(wins, 1);
	}

	#[tokio::test]
	async fn test_mark_unknown_block_is_noop() {
		let repo = seeded_repo().await;
		assert!(!repo.mark_notified("missing").await.unwrap());
		assert_eq!(repo.is_notified("missing").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_ping() {
		let repo = seeded_repo().await;
		repo.ping().await.unwrap();
	}
}
