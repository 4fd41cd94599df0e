// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Block store backed by a PostgREST API in front of the managed database.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiet_common_secret::SecretString;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::block::BlockStore;
use crate::error::{DbError, Result};
use crate::notification::NotificationStore;
use crate::types::{format_timestamp, DueBlock, NotificationAttempt, NotificationStatus};
use uuid::Uuid;

const DUE_BLOCK_SELECT: &str =
	"id,title,start_time,user_id,notified,profiles!inner(email,full_name)";

#[derive(Debug, Deserialize)]
struct BlockRow {
	id: String,
	title: String,
	start_time: DateTime<Utc>,
	user_id: String,
	#[serde(default)]
	profiles: Option<ProfileEmbed>,
}

#[derive(Debug, Deserialize)]
struct ProfileEmbed {
	email: Option<String>,
	full_name: Option<String>,
}

/// Insert body for the hosted `notifications` table. The table assigns its own
/// id; `notified_at` is only written for sent attempts.
#[derive(Debug, Serialize)]
struct NotificationRow<'a> {
	block_id: &'a str,
	user_id: &'a str,
	user_email: &'a str,
	send_at: String,
	status: NotificationStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	notified_at: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error_message: Option<&'a str>,
}

impl<'a> From<&'a NotificationAttempt> for NotificationRow<'a> {
	fn from(attempt: &'a NotificationAttempt) -> Self {
		let send_at = format_timestamp(attempt.attempted_at);
		let notified_at = match attempt.status {
			NotificationStatus::Sent => Some(send_at.clone()),
			NotificationStatus::Failed => None,
		};
		Self {
			block_id: &attempt.block_id,
			user_id: &attempt.user_id,
			user_email: &attempt.user_email,
			send_at,
			status: attempt.status,
			notified_at,
			error_message: attempt.error_detail.as_deref(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct StoredNotification {
	#[serde(default)]
	id: Option<Uuid>,
	block_id: String,
	user_id: String,
	user_email: String,
	status: NotificationStatus,
	send_at: DateTime<Utc>,
	#[serde(default)]
	error_message: Option<String>,
}

impl From<StoredNotification> for NotificationAttempt {
	fn from(row: StoredNotification) -> Self {
		Self {
			id: row.id.unwrap_or_else(Uuid::nil),
			block_id: row.block_id,
			user_id: row.user_id,
			user_email: row.user_email,
			status: row.status,
			attempted_at: row.send_at,
			error_detail: row.error_message,
		}
	}
}

/// PostgREST client implementing both store traits.
///
/// Every request carries the service key as both `apikey` and bearer token.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
	http_client: Client,
	rest_url: String,
	service_key: SecretString,
}

impl PostgrestStore {
	pub fn new(
		rest_url: impl Into<String>,
		service_key: SecretString,
		timeout: Duration,
	) -> Result<Self> {
		let http_client = quiet_common_http::new_client_with_timeout(timeout)?;
		Ok(Self::with_client(http_client, rest_url, service_key))
	}

	pub fn with_client(
		http_client: Client,
		rest_url: impl Into<String>,
		service_key: SecretString,
	) -> Self {
		let rest_url: String = rest_url.into();
		Self {
			http_client,
			rest_url: rest_url.trim_end_matches('/').to_string(),
			service_key,
		}
	}

	fn table_url(&self, table: &str) -> String {
		format!("{}/{}", self.rest_url, table)
	}

	fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
		let key = self.service_key.expose();
		request
			.header("apikey", key.as_str())
			.bearer_auth(key)
	}

	async fn check(response: Response) -> Result<Response> {
		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}
		let body = response.text().await.unwrap_or_default();
		Err(DbError::UnexpectedStatus {
			status: status.as_u16(),
			body,
		})
	}

	async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
		let body = response.text().await?;
		trace!(body = %body, "store response body");
		Ok(serde_json::from_str(&body)?)
	}

	#[instrument(skip(self), fields(rest_url = %self.rest_url))]
	pub async fn list_due_blocks(
		&self,
		window_start: DateTime<Utc>,
		window_end: DateTime<Utc>,
	) -> Result<Vec<DueBlock>> {
		let from = format!("gte.{}", format_timestamp(window_start));
		let until = format!("lt.{}", format_timestamp(window_end));
		let request = self.http_client.get(self.table_url("blocks")).query(&[
			("select", DUE_BLOCK_SELECT),
			("notified", "eq.false"),
			("start_time", from.as_str()),
			("start_time", until.as_str()),
			("order", "start_time.asc"),
		]);

		let response = Self::check(self.authorize(request).send().await?).await?;
		let rows: Vec<BlockRow> = Self::decode(response).await?;
		debug!(count = rows.len(), "fetched due blocks");

		Ok(
			rows
				.into_iter()
				.map(|row| {
					let (email, full_name) = match row.profiles {
						Some(p) => (p.email, p.full_name),
						None => (None, None),
					};
					DueBlock {
						id: row.id,
						title: row.title,
						start_time: row.start_time,
						user_id: row.user_id,
						email,
						full_name,
					}
				})
				.collect(),
		)
	}

	#[instrument(skip(self), fields(block_id = %block_id))]
	pub async fn mark_notified(&self, block_id: &str) -> Result<bool> {
		let id_filter = format!("eq.{block_id}");
		let request = self
			.http_client
			.patch(self.table_url("blocks"))
			.query(&[("id", id_filter.as_str()), ("notified", "eq.false")])
			.header("Prefer", "return=representation")
			.json(&serde_json::json!({ "notified": true }));

		let response = Self::check(self.authorize(request).send().await?).await?;
		let flipped: Vec<serde_json::Value> = Self::decode(response).await?;
		Ok(!flipped.is_empty())
	}

	#[instrument(skip(self, attempt), fields(block_id = %attempt.block_id, status = attempt.status.as_str()))]
	pub async fn append_attempt(&self, attempt: &NotificationAttempt) -> Result<()> {
		let request = self
			.http_client
			.post(self.table_url("notifications"))
			.header("Prefer", "return=minimal")
			.json(&NotificationRow::from(attempt));

		Self::check(self.authorize(request).send().await?).await?;
		Ok(())
	}

	#[instrument(skip(self))]
	pub async fn list_attempts_for_block(&self, block_id: &str) -> Result<Vec<NotificationAttempt>> {
		let id_filter = format!("eq.{block_id}");
		let request = self
			.http_client
			.get(self.table_url("notifications"))
			.query(&[
				("select", "*"),
				("block_id", id_filter.as_str()),
				("order", "send_at.asc"),
			]);

		let response = Self::check(self.authorize(request).send().await?).await?;
		let rows: Vec<StoredNotification> = Self::decode(response).await?;
		Ok(rows.into_iter().map(NotificationAttempt::from).collect())
	}

	pub async fn ping(&self) -> Result<()> {
		let request = self
			.http_client
			.head(self.table_url("blocks"))
			.query(&[("select", "id"), ("limit", "1")]);
		Self::check(self.authorize(request).send().await?).await?;
		Ok(())
	}
}

#[async_trait]
impl BlockStore for PostgrestStore {
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

#[async_trait]
impl NotificationStore for PostgrestStore {
	async fn append_attempt(&self, attempt: &NotificationAttempt) -> Result<()> {
		self.append_attempt(attempt).await
	}

	async fn list_attempts_for_block(&self, block_id: &str) -> Result<Vec<NotificationAttempt>> {
		self.list_attempts_for_block(block_id).await
	}
}
