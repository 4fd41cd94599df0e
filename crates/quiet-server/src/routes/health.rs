// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
	health::{self, HealthComponents, HealthResponse, HealthStatus},
	AppState,
};

/// GET /health
#[tracing::instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let (store, email, scheduler) = tokio::join!(
		health::check_store(&state.services.blocks, state.services.store_backend),
		health::check_email(&state.services.transport),
		health::check_scheduler(state.scheduler.as_ref()),
	);

	let components = HealthComponents {
		store,
		email,
		scheduler,
	};
	let status = health::aggregate_status(&components);

	let response = HealthResponse {
		status,
		timestamp: chrono::Utc::now().to_rfc3339(),
		components,
	};

	let http_status = match status {
		HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
		HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
	};

	(http_status, Json(response))
}
