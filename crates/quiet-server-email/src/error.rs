// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

/// Errors raised while sending a single message.
///
/// The dispatcher treats every variant as retryable.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
	/// The provider answered with a non-2xx status.
	#[error("email provider rejected message: {status} {body}")]
	Rejected { status: u16, body: String },

	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("SMTP error: {0}")]
	Smtp(String),

	#[error("invalid email address: {0}")]
	Address(String),
}

pub type Result<T> = std::result::Result<T, EmailError>;
