// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::env::load_secret_env;
use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	DispatchConfigLayer, EmailConfigLayer, EmailProvider, HttpConfigLayer, LogFormat,
	LoggingConfigLayer, SchedulerConfigLayer, SmtpConfigLayer, StoreBackend, StoreConfigLayer,
	TlsMode, TriggerConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/quiet-hours/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: QUIET_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			store: Some(load_store_from_env()?),
			email: Some(load_email_from_env()?),
			smtp: Some(load_smtp_from_env()?),
			dispatch: Some(load_dispatch_from_env()?),
			trigger: Some(load_trigger_from_env()?),
			scheduler: Some(load_scheduler_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u16 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u32(name: &str) -> Result<Option<u32>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u32 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid usize value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("QUIET_SERVER_HOST"),
		port: env_u16("QUIET_SERVER_PORT")?,
	})
}

fn load_store_from_env() -> Result<StoreConfigLayer, ConfigError> {
	let backend = env_var("QUIET_SERVER_STORE_BACKEND")
		.map(|v| StoreBackend::from_str_value(&v))
		.transpose()?;
	Ok(StoreConfigLayer {
		backend,
		database_url: env_var("QUIET_SERVER_DATABASE_URL"),
		rest_url: env_var("QUIET_SERVER_STORE_REST_URL"),
		service_key: load_secret_env("QUIET_SERVER_STORE_SERVICE_KEY")?,
	})
}

fn load_email_from_env() -> Result<EmailConfigLayer, ConfigError> {
	let provider = env_var("QUIET_SERVER_EMAIL_PROVIDER")
		.map(|v| EmailProvider::from_str_value(&v))
		.transpose()?;
	Ok(EmailConfigLayer {
		provider,
		api_key: load_secret_env("QUIET_SERVER_EMAIL_API_KEY")?,
		endpoint: env_var("QUIET_SERVER_EMAIL_ENDPOINT"),
		from: env_var("QUIET_SERVER_EMAIL_FROM"),
		subject: env_var("QUIET_SERVER_EMAIL_SUBJECT"),
		request_timeout_secs: env_u64("QUIET_SERVER_EMAIL_REQUEST_TIMEOUT_SECS")?,
	})
}

fn load_smtp_from_env() -> Result<SmtpConfigLayer, ConfigError> {
	let tls = env_var("QUIET_SERVER_SMTP_TLS")
		.map(|v| TlsMode::from_str_value(&v))
		.transpose()?;
	Ok(SmtpConfigLayer {
		host: env_var("QUIET_SERVER_SMTP_HOST"),
		port: env_u16("QUIET_SERVER_SMTP_PORT")?,
		username: env_var("QUIET_SERVER_SMTP_USERNAME"),
		password: load_secret_env("QUIET_SERVER_SMTP_PASSWORD")?,
		tls,
	})
}

fn load_dispatch_from_env() -> Result<DispatchConfigLayer, ConfigError> {
	Ok(DispatchConfigLayer {
		reminder_lead_secs: env_u64("QUIET_SERVER_DISPATCH_REMINDER_LEAD_SECS")?,
		max_send_attempts: env_u32("QUIET_SERVER_DISPATCH_MAX_SEND_ATTEMPTS")?,
		retry_delay_ms: env_u64("QUIET_SERVER_DISPATCH_RETRY_DELAY_MS")?,
		concurrency: env_usize("QUIET_SERVER_DISPATCH_CONCURRENCY")?,
		display_timezone: env_var("QUIET_SERVER_DISPATCH_DISPLAY_TIMEZONE"),
	})
}

fn load_trigger_from_env() -> Result<TriggerConfigLayer, ConfigError> {
	Ok(TriggerConfigLayer {
		cron_secret: load_secret_env("QUIET_SERVER_CRON_SECRET")?,
	})
}

fn load_scheduler_from_env() -> Result<SchedulerConfigLayer, ConfigError> {
	Ok(SchedulerConfigLayer {
		enabled: env_bool("QUIET_SERVER_SCHEDULER_ENABLED"),
		interval_secs: env_u64("QUIET_SERVER_SCHEDULER_INTERVAL_SECS")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = env_var("QUIET_SERVER_LOG_FORMAT")
		.map(|v| LogFormat::from_str_value(&v))
		.transpose()?;
	Ok(LoggingConfigLayer {
		level: env_var("QUIET_SERVER_LOG_LEVEL"),
		format,
	})
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.http.is_none());
		assert!(layer.store.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let source = TomlSource::new("/nonexistent/config.toml");
		let layer = source.load().unwrap();
		assert!(layer.http.is_none());
	}

	#[test]
	fn test_toml_source_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[scheduler]\nenabled = true\ninterval_secs = 60").unwrap();
		let layer = TomlSource::new(file.path()).load().unwrap();
		let scheduler = layer.scheduler.unwrap();
		assert_eq!(scheduler.enabled, Some(true));
		assert_eq!(scheduler.interval_secs, Some(60));
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[http\nport = ").unwrap();
		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}
}
