// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory store and scripted transport shared by this crate's tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiet_server_db::{BlockStore, DbError, DueBlock, NotificationAttempt, NotificationStore};
use quiet_server_email::{EmailError, EmailMessage, EmailTransport, SendReceipt};

#[derive(Debug, Clone)]
pub struct MemBlock {
	pub id: String,
	pub title: String,
	pub start_time: DateTime<Utc>,
	pub user_id: String,
	pub email: Option<String>,
	pub full_name: Option<String>,
	pub notified: bool,
}

pub fn due_block(id: &str, start_time: DateTime<Utc>, email: Option<&str>) -> MemBlock {
	MemBlock {
		id: id.to_string(),
		title: format!("Block {id}"),
		start_time,
		user_id: format!("user-{id}"),
		email: email.map(str::to_string),
		full_name: Some("Ada".to_string()),
		notified: false,
	}
}

/// Both store traits over a `Vec`, with read/write counters and failure switches.
#[derive(Default)]
pub struct MemoryStore {
	blocks: Mutex<Vec<MemBlock>>,
	attempts: Mutex<Vec<NotificationAttempt>>,
	reads: AtomicU32,
	writes: AtomicU32,
	fail_fetch: AtomicBool,
	fail_writes: AtomicBool,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, block: MemBlock) {
		self.blocks.lock().unwrap().push(block);
	}

	pub fn fail_fetch(&self) {
		self.fail_fetch.store(true, Ordering::SeqCst);
	}

	pub fn fail_writes(&self) {
		self.fail_writes.store(true, Ordering::SeqCst);
	}

	pub fn reads(&self) -> u32 {
		self.reads.load(Ordering::SeqCst)
	}

	pub fn writes(&self) -> u32 {
		self.writes.load(Ordering::SeqCst)
	}

	pub fn is_notified(&self, id: &str) -> bool {
		self
			.blocks
			.lock()
			.unwrap()
			.iter()
			.any(|b| b.id == id && b.notified)
	}

	pub fn attempts_for(&self, block_id: &str) -> Vec<NotificationAttempt> {
		self
			.attempts
			.lock()
			.unwrap()
			.iter()
			.filter(|a| a.block_id == block_id)
			.cloned()
			.collect()
	}

	pub fn all_attempts(&self) -> Vec<NotificationAttempt> {
		self.attempts.lock().unwrap().clone()
	}

	fn write_guard(&self) -> Result<(), DbError> {
		self.writes.fetch_add(1, Ordering::SeqCst);
		if self.fail_writes.load(Ordering::SeqCst) {
			return Err(DbError::Internal("store unavailable".to_string()));
		}
		Ok(())
	}
}

#[async_trait]
impl BlockStore for MemoryStore {
	async fn list_due_blocks(
		&self,
		window_start: DateTime<Utc>,
		window_end: DateTime<Utc>,
	) -> Result<Vec<DueBlock>, DbError> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		if self.fail_fetch.load(Ordering::SeqCst) {
			return Err(DbError::Internal("connection refused".to_string()));
		}
		Ok(
			self
				.blocks
				.lock()
				.unwrap()
				.iter()
				.filter(|b| !b.notified && window_start <= b.start_time && b.start_time < window_end)
				.map(|b| DueBlock {
					id: b.id.clone(),
					title: b.title.clone(),
					start_time: b.start_time,
					user_id: b.user_id.clone(),
					email: b.email.clone(),
					full_name: b.full_name.clone(),
				})
				.collect(),
		)
	}

	async fn mark_notified(&self, block_id: &str) -> Result<bool, DbError> {
		self.write_guard()?;
		let mut blocks = self.blocks.lock().unwrap();
		match blocks.iter_mut().find(|b| b.id == block_id && !b.notified) {
			Some(block) => {
				block.notified = true;
				Ok(true)
			}
			None => Ok(false),
		}
	}

	async fn ping(&self) -> Result<(), DbError> {
		Ok(())
	}
}

#[async_trait]
impl NotificationStore for MemoryStore {
	async fn append_attempt(&self, attempt: &NotificationAttempt) -> Result<(), DbError> {
		self.write_guard()?;
		self.attempts.lock().unwrap().push(attempt.clone());
		Ok(())
	}

	async fn list_attempts_for_block(
		&self,
		block_id: &str,
	) -> Result<Vec<NotificationAttempt>, DbError> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		Ok(self.attempts_for(block_id))
	}
}

/// Fails the first `failures` calls overall, and every call to a recipient in
/// `always_fail`.
#[derive(Default)]
pub struct ScriptedTransport {
	failures: u32,
	always_fail: HashSet<String>,
	calls: AtomicU32,
}

impl ScriptedTransport {
	pub fn succeeding() -> Self {
		Self::default()
	}

	pub fn failing_first(failures: u32) -> Self {
		Self {
			failures,
			..Self::default()
		}
	}

	pub fn failing_for(recipients: &[&str]) -> Self {
		Self {
			always_fail: recipients.iter().map(|r| r.to_string()).collect(),
			..Self::default()
		}
	}

	pub fn calls(&self) -> u32 {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl EmailTransport for ScriptedTransport {
	fn name(&self) -> &'static str {
		"scripted"
	}

	async fn send(&self, message: &EmailMessage) -> Result<SendReceipt, EmailError> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
		if call <= self.failures || self.always_fail.contains(&message.to) {
			return Err(EmailError::Rejected {
				status: 503,
				body: "service unavailable".to_string(),
			});
		}
		Ok(SendReceipt::default())
	}
}
