// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Block store configuration.
//!
//! The dispatcher talks to the block store either through a local SQLite
//! database or through the managed database's PostgREST API.

use quiet_common_secret::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_DATABASE_URL: &str = "sqlite:./quiet-hours.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
	#[default]
	Sqlite,
	Postgrest,
}

impl StoreBackend {
	pub fn from_str_value(value: &str) -> Result<Self, ConfigError> {
		match value.to_lowercase().as_str() {
			"sqlite" => Ok(StoreBackend::Sqlite),
			"postgrest" | "rest" => Ok(StoreBackend::Postgrest),
			_ => Err(ConfigError::InvalidValue {
				key: "store.backend".to_string(),
				message: format!("'{value}' is not one of: sqlite, postgrest"),
			}),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfigLayer {
	pub backend: Option<StoreBackend>,
	pub database_url: Option<String>,
	pub rest_url: Option<String>,
	#[serde(skip_serializing)]
	pub service_key: Option<SecretString>,
}

impl StoreConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.backend.is_some() {
			self.backend = other.backend;
		}
		if other.database_url.is_some() {
			self.database_url = other.database_url;
		}
		if other.rest_url.is_some() {
			self.rest_url = other.rest_url;
		}
		if other.service_key.is_some() {
			self.service_key = other.service_key;
		}
	}

	pub fn finalize(self) -> Result<StoreConfig, ConfigError> {
		match self.backend.unwrap_or_default() {
			StoreBackend::Sqlite => Ok(StoreConfig::Sqlite {
				database_url: self
					.database_url
					.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
			}),
			StoreBackend::Postgrest => {
				let rest_url = self
					.rest_url
					.ok_or_else(|| ConfigError::Missing("store.rest_url".to_string()))?;
				let service_key = self
					.service_key
					.filter(|k| !k.is_blank())
					.ok_or_else(|| ConfigError::Missing("store.service_key".to_string()))?;
				Ok(StoreConfig::Postgrest {
					rest_url: rest_url.trim_end_matches('/').to_string(),
					service_key,
				})
			}
		}
	}
}

/// Resolved store configuration.
#[derive(Debug, Clone)]
pub enum StoreConfig {
	Sqlite {
		database_url: String,
	},
	Postgrest {
		rest_url: String,
		service_key: SecretString,
	},
}

impl StoreConfig {
	pub fn backend(&self) -> StoreBackend {
		match self {
			StoreConfig::Sqlite { .. } => StoreBackend::Sqlite,
			StoreConfig::Postgrest { .. } => StoreBackend::Postgrest,
		}
	}

	/// Location string that is safe to log.
	pub fn location(&self) -> &str {
		match self {
			StoreConfig::Sqlite { database_url } => database_url,
			StoreConfig::Postgrest { rest_url, .. } => rest_url,
		}
	}
}

impl Default for StoreConfig {
	fn default() -> Self {
		StoreConfig::Sqlite {
			database_url: DEFAULT_DATABASE_URL.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_is_sqlite() {
		let config = StoreConfigLayer::default().finalize().unwrap();
		assert_eq!(config.backend(), StoreBackend::Sqlite);
		assert_eq!(config.location(), "sqlite:./quiet-hours.db");
	}

	#[test]
	fn test_postgrest_requires_url_and_key() {
		let layer = StoreConfigLayer {
			backend: Some(StoreBackend::Postgrest),
			..Default::default()
		};
		let err = layer.finalize().unwrap_err();
		assert!(err.to_string().contains("store.rest_url"));

		let layer = StoreConfigLayer {
			backend: Some(StoreBackend::Postgrest),
			rest_url: Some("https://db.example.com/rest/v1".to_string()),
			..Default::default()
		};
		let err = layer.finalize().unwrap_err();
		assert!(err.to_string().contains("store.service_key"));
	}

	#[test]
	fn test_postgrest_trims_trailing_slash() {
		let layer = StoreConfigLayer {
			backend: Some(StoreBackend::Postgrest),
			rest_url: Some("https://db.example.com/rest/v1/".to_string()),
			service_key: Some(SecretString::new("service-role".to_string())),
			..Default::default()
		};
		let config = layer.finalize().unwrap();
		assert_eq!(config.location(), "https://db.example.com/rest/v1");
	}

	#[test]
	fn test_backend_parsing() {
		assert_eq!(
			StoreBackend::from_str_value("PostgREST").unwrap(),
			StoreBackend::Postgrest
		);
		assert!(StoreBackend::from_str_value("mongo").is_err());
	}

	#[test]
	fn test_deserialize_layer_partial() {
		let layer: StoreConfigLayer = toml::from_str(r#"backend = "postgrest""#).unwrap();
		assert_eq!(layer.backend, Some(StoreBackend::Postgrest));
		assert!(layer.rest_url.is_none());
	}
}
