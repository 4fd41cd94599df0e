// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds stores, the email transport and the dispatch job from configuration.

use std::sync::Arc;
use std::time::Duration;

use quiet_common_http::RetryPolicy;
use quiet_server_config::{ConfigError, EmailTransportConfig, ServerConfig, StoreConfig};
use quiet_server_db::{
	create_pool, run_migrations, BlockRepository, BlockStore, NotificationRepository,
	NotificationStore, PostgrestStore,
};
use quiet_server_email::{
	EmailDispatcher, EmailTransport, ReminderTemplate, ResendTransport, SmtpTransport,
};
use quiet_server_jobs::{CandidateFetcher, NotificationDispatchJob, OutcomeRecorder};

use crate::error::ServerError;

/// Store and transport handles shared by the job and the health checks.
#[derive(Clone)]
pub struct Services {
	pub blocks: Arc<dyn BlockStore>,
	pub log: Arc<dyn NotificationStore>,
	pub transport: Arc<dyn EmailTransport>,
	pub store_backend: &'static str,
}

impl Services {
	pub fn new(
		blocks: Arc<dyn BlockStore>,
		log: Arc<dyn NotificationStore>,
		transport: Arc<dyn EmailTransport>,
		store_backend: &'static str,
	) -> Self {
		Self {
			blocks,
			log,
			transport,
			store_backend,
		}
	}
}

/// Connect to the configured store. SQLite databases are migrated on open.
pub async fn connect_store(
	config: &ServerConfig,
) -> Result<(Arc<dyn BlockStore>, Arc<dyn NotificationStore>), ServerError> {
	match &config.store {
		StoreConfig::Sqlite { database_url } => {
			let pool = create_pool(database_url).await?;
			run_migrations(&pool).await?;
			let blocks: Arc<dyn BlockStore> = Arc::new(BlockRepository::new(pool.clone()));
			let log: Arc<dyn NotificationStore> = Arc::new(NotificationRepository::new(pool));
			Ok((blocks, log))
		}
		StoreConfig::Postgrest {
			rest_url,
			service_key,
		} => {
			let store = Arc::new(PostgrestStore::new(
				rest_url.clone(),
				service_key.clone(),
				Duration::from_secs(config.email.request_timeout_secs),
			)?);
			let blocks: Arc<dyn BlockStore> = store.clone();
			let log: Arc<dyn NotificationStore> = store;
			Ok((blocks, log))
		}
	}
}

pub fn build_transport(config: &ServerConfig) -> Result<Arc<dyn EmailTransport>, ServerError> {
	let timeout = Duration::from_secs(config.email.request_timeout_secs);
	let transport: Arc<dyn EmailTransport> = match &config.email.transport {
		EmailTransportConfig::Resend { endpoint, api_key } => {
			Arc::new(ResendTransport::new(api_key.clone(), timeout)?.with_endpoint(endpoint.clone()))
		}
		EmailTransportConfig::Smtp(smtp) => Arc::new(SmtpTransport::new(smtp)?),
	};
	Ok(transport)
}

pub async fn build_services(config: &ServerConfig) -> Result<Services, ServerError> {
	let (blocks, log) = connect_store(config).await?;
	let transport = build_transport(config)?;
	let backend = match config.store {
		StoreConfig::Sqlite { .. } => "sqlite",
		StoreConfig::Postgrest { .. } => "postgrest",
	};
	tracing::info!(
		store = backend,
		location = %config.store.location(),
		transport = transport.name(),
		"services initialized"
	);
	Ok(Services::new(blocks, log, transport, backend))
}

/// Fails when the configured reminder lead does not fit a `chrono::Duration`.
pub fn build_job(
	config: &ServerConfig,
	services: &Services,
) -> Result<NotificationDispatchJob, ServerError> {
	let dispatch = &config.dispatch;
	let dispatcher = EmailDispatcher::new(
		Arc::clone(&services.transport),
		ReminderTemplate::new(config.email.subject.clone(), dispatch.display_timezone),
		config.email.from.clone(),
		RetryPolicy::fixed(
			dispatch.max_send_attempts,
			Duration::from_millis(dispatch.retry_delay_ms),
		),
	);
	let lead = i64::try_from(dispatch.reminder_lead_secs)
		.ok()
		.and_then(chrono::Duration::try_seconds)
		.ok_or_else(|| {
			ConfigError::Validation(format!(
				"dispatch.reminder_lead_secs out of range: {}",
				dispatch.reminder_lead_secs
			))
		})?;

	let job = NotificationDispatchJob::new(
		CandidateFetcher::new(Arc::clone(&services.blocks)),
		dispatcher,
		OutcomeRecorder::new(Arc::clone(&services.blocks), Arc::clone(&services.log)),
		config.trigger.cron_secret.clone(),
	)
	.with_lead(lead)
	.with_concurrency(dispatch.concurrency);
	Ok(job)
}
