// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Quiet Hours server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`QUIET_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use quiet_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}", config.socket_addr());
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use env::{load_secret_env, SecretEnvError};
pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub store: StoreConfig,
	pub email: EmailConfig,
	pub dispatch: DispatchConfig,
	pub trigger: TriggerConfig,
	pub scheduler: SchedulerConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`QUIET_SERVER_*`)
/// 2. Config file (`/etc/quiet-hours/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let store = layer.store.unwrap_or_default().finalize()?;
	let email = layer
		.email
		.unwrap_or_default()
		.finalize(layer.smtp.unwrap_or_default())?;
	let dispatch = layer.dispatch.unwrap_or_default().finalize()?;
	let trigger = layer.trigger.unwrap_or_default().finalize()?;
	let scheduler = layer.scheduler.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&dispatch, &scheduler)?;

	info!(
		host = %http.host,
		port = http.port,
		store_backend = ?store.backend(),
		store = %store.location(),
		email_provider = ?email.provider(),
		reminder_lead_secs = dispatch.reminder_lead_secs,
		max_send_attempts = dispatch.max_send_attempts,
		concurrency = dispatch.concurrency,
		scheduler_enabled = scheduler.enabled,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		store,
		email,
		dispatch,
		trigger,
		scheduler,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(
	dispatch: &DispatchConfig,
	scheduler: &SchedulerConfig,
) -> Result<(), ConfigError> {
	if dispatch.max_send_attempts == 0 {
		return Err(ConfigError::Validation(
			"dispatch.max_send_attempts must be at least 1".to_string(),
		));
	}
	if dispatch.concurrency == 0 {
		return Err(ConfigError::Validation(
			"dispatch.concurrency must be at least 1".to_string(),
		));
	}
	if dispatch.reminder_lead_secs == 0 {
		return Err(ConfigError::Validation(
			"dispatch.reminder_lead_secs must be greater than zero".to_string(),
		));
	}
	if dispatch.reminder_lead_secs > MAX_REMINDER_LEAD_SECS {
		return Err(ConfigError::Validation(format!(
			"dispatch.reminder_lead_secs must be at most {MAX_REMINDER_LEAD_SECS}"
		)));
	}
	if scheduler.enabled && scheduler.interval_secs == 0 {
		return Err(ConfigError::Validation(
			"scheduler.interval_secs must be greater than zero when the scheduler is enabled"
				.to_string(),
		));
	}

	Ok(())
}
