// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use quiet_server_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
	#[error("Job cancelled")]
	Cancelled,

	/// The candidate query failed; nothing was sent or written.
	#[error("Fetch failed: {0}")]
	Fetch(#[source] DbError),

	#[error("Trigger rejected")]
	Unauthorized,
}

pub type Result<T> = std::result::Result<T, JobError>;
