// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Configuration error: {0}")]
	Config(#[from] quiet_server_config::ConfigError),

	#[error("Store error: {0}")]
	Db(#[from] quiet_server_db::DbError),

	#[error("Email error: {0}")]
	Email(#[from] quiet_server_email::EmailError),

	#[error("Unauthorized")]
	Unauthorized,
}

/// Error response body. Details stay in the logs.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
}

impl ErrorResponse {
	pub fn new(error: impl Into<String>) -> Self {
		Self {
			error: error.into(),
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		match &self {
			ServerError::Unauthorized => (
				StatusCode::UNAUTHORIZED,
				Json(ErrorResponse::new("Unauthorized")),
			)
				.into_response(),
			other => {
				tracing::error!(error = %other, "request failed");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					Json(ErrorResponse::new("Internal Server Error")),
				)
					.into_response()
			}
		}
	}
}
