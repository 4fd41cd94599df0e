// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The cron-facing trigger for one dispatch run.

use axum::{
	extract::State,
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use quiet_server_jobs::{RunOutcome, RunSummary};
use serde::Serialize;

use crate::{error::ServerError, AppState};

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sent: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub failed: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub skipped: Option<usize>,
}

impl From<&RunSummary> for TriggerResponse {
	fn from(summary: &RunSummary) -> Self {
		if summary.is_empty() {
			return TriggerResponse {
				success: true,
				message: Some("No notifications".to_string()),
				sent: None,
				failed: None,
				skipped: None,
			};
		}
		TriggerResponse {
			success: true,
			message: None,
			sent: Some(summary.sent),
			failed: Some(summary.failed),
			skipped: Some(summary.skipped),
		}
	}
}

/// /functions/v1/send-notifications
///
/// Accepts any method; schedulers differ in what they send. Only the secret
/// header is checked.
#[tracing::instrument(skip(state, headers))]
pub async fn send_notifications(State(state): State<AppState>, headers: HeaderMap) -> Response {
	let presented = headers
		.get(CRON_SECRET_HEADER)
		.and_then(|value| value.to_str().ok());

	match state.job.trigger(presented).await {
		RunOutcome::Rejected => ServerError::Unauthorized.into_response(),
		RunOutcome::Aborted { error, .. } => ServerError::Db(error).into_response(),
		RunOutcome::Completed(summary) => {
			(StatusCode::OK, Json(TriggerResponse::from(&summary))).into_response()
		}
	}
}
