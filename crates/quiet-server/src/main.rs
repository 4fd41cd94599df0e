// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Quiet Hours reminder server binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use quiet_server::{build_job, build_services, create_router, version, AppState};
use quiet_server_config::{LogFormat, LoggingConfig, ServerConfig, StoreConfig};
use quiet_server_jobs::{Job, JobContext, JobScheduler, RunOutcome, TriggerSource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Quiet Hours server - sends study block reminders.
#[derive(Parser, Debug)]
#[command(name = "quiet-server", about = "Quiet Hours reminder server", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/quiet-hours/server.toml)
	#[arg(long, env = "QUIET_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Start the HTTP server (default)
	Serve,
	/// Execute one dispatch run and print its summary
	RunOnce,
	/// Apply SQLite migrations and exit
	Migrate,
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => quiet_server_config::load_config_with_file(path.clone()),
		None => quiet_server_config::load_config(),
	}
	.context("failed to load configuration")?;

	init_tracing(&config.logging);

	match args.command.unwrap_or(Command::Serve) {
		Command::Serve => serve(config).await,
		Command::RunOnce => run_once(config).await,
		Command::Migrate => migrate(config).await,
		Command::Version => Ok(()),
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
	let registry = tracing_subscriber::registry().with(filter);
	match logging.format {
		LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
		LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
	}
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		store = %config.store.location(),
		"starting quiet-server"
	);

	let services = build_services(&config).await?;
	let job = Arc::new(build_job(&config, &services)?);

	let scheduler = if config.scheduler.enabled {
		let mut scheduler = JobScheduler::new();
		scheduler.register_periodic(
			Arc::clone(&job) as Arc<dyn Job>,
			Duration::from_secs(config.scheduler.interval_secs),
		);
		let scheduler = Arc::new(scheduler);
		if let Err(e) = scheduler.start().await {
			tracing::error!(error = %e, "Failed to start job scheduler");
		}
		Some(scheduler)
	} else {
		None
	};

	let app = create_router(AppState {
		job,
		services,
		scheduler: scheduler.clone(),
	});

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	if let Some(scheduler) = scheduler {
		tracing::info!("Shutting down job scheduler...");
		scheduler.shutdown().await;
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}

async fn run_once(config: ServerConfig) -> anyhow::Result<()> {
	let services = build_services(&config).await?;
	let job = build_job(&config, &services)?;

	match job.execute(&JobContext::new(TriggerSource::Manual)).await {
		RunOutcome::Completed(summary) => {
			println!("{}", serde_json::to_string_pretty(&summary)?);
			Ok(())
		}
		RunOutcome::Aborted { run_id, error } => {
			Err(anyhow::Error::new(error).context(format!("dispatch run {run_id} aborted")))
		}
		RunOutcome::Rejected => anyhow::bail!("dispatch run rejected"),
	}
}

async fn migrate(config: ServerConfig) -> anyhow::Result<()> {
	match &config.store {
		StoreConfig::Sqlite { database_url } => {
			let pool = quiet_server_db::create_pool(database_url).await?;
			quiet_server_db::run_migrations(&pool).await?;
			tracing::info!(database = %database_url, "migrations applied");
		}
		StoreConfig::Postgrest { rest_url, .. } => {
			tracing::info!(rest_url = %rest_url, "PostgREST schema is managed upstream, nothing to migrate");
		}
	}
	Ok(())
}
