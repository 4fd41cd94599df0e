// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret loading from environment variables.
//!
//! Secrets follow the `VAR` / `VAR_FILE` convention so the cron secret and API
//! keys can be mounted as Docker or Kubernetes secret files.

use std::path::PathBuf;
use std::{env, fs};

use quiet_common_secret::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load a secret from `{var}_FILE` (preferred) or `{var}`.
///
/// A single trailing newline is stripped from file contents. An empty direct
/// value is treated as unset.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}
		return read_secret_file(PathBuf::from(path_str)).map(Some);
	}

	match env::var(var) {
		Ok(value) if !value.is_empty() => Ok(Some(SecretString::new(value))),
		_ => Ok(None),
	}
}

fn read_secret_file(path: PathBuf) -> Result<SecretString, SecretEnvError> {
	let content = fs::read_to_string(&path).map_err(|e| SecretEnvError::Io {
		path: path.clone(),
		source: e,
	})?;
	let trimmed = content.strip_suffix('\n').unwrap_or(&content);
	Ok(SecretString::new(trimmed.to_string()))
}
