// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP host for the Quiet Hours reminder job.
//!
//! Exposes the cron trigger and a health endpoint, and optionally runs the
//! dispatch job on an in-process schedule.

pub mod error;
pub mod health;
pub mod routes;
pub mod services;
pub mod version;

use std::sync::Arc;

use axum::{
	routing::{any, get},
	Router,
};
use quiet_server_jobs::{JobScheduler, NotificationDispatchJob};
use tower_http::trace::TraceLayer;

pub use error::{ErrorResponse, ServerError};
pub use routes::trigger::CRON_SECRET_HEADER;
pub use services::{build_job, build_services, build_transport, connect_store, Services};

pub const TRIGGER_PATH: &str = "/functions/v1/send-notifications";

#[derive(Clone)]
pub struct AppState {
	pub job: Arc<NotificationDispatchJob>,
	pub services: Services,
	pub scheduler: Option<Arc<JobScheduler>>,
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route(TRIGGER_PATH, any(routes::trigger::send_notifications))
		.route("/health", get(routes::health::health_check))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
