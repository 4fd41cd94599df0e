// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component health checks reported by `GET /health`.

use std::sync::Arc;
use std::time::Duration;

use quiet_server_db::BlockStore;
use quiet_server_email::EmailTransport;
use quiet_server_jobs::{HealthState, JobScheduler};
use serde::Serialize;
use tokio::time::{timeout, Instant};

const STORE_CHECK_TIMEOUT: Duration = Duration::from_secs(2);
const EMAIL_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
	pub status: HealthStatus,
	pub backend: &'static str,
	pub latency_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmailHealth {
	pub status: HealthStatus,
	pub transport: &'static str,
	pub latency_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SchedulerHealth {
	pub status: HealthStatus,
	pub jobs_total: usize,
	pub jobs_failing: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub failing_jobs: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
	pub store: StoreHealth,
	pub email: EmailHealth,
	/// Absent when the in-process scheduler is disabled.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub scheduler: Option<SchedulerHealth>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub timestamp: String,
	pub components: HealthComponents,
}

pub async fn check_store(store: &Arc<dyn BlockStore>, backend: &'static str) -> StoreHealth {
	let start = Instant::now();
	let result = timeout(STORE_CHECK_TIMEOUT, store.ping()).await;
	let latency_ms = start.elapsed().as_millis() as u64;

	let (status, error) = match result {
		Ok(Ok(())) => (HealthStatus::Healthy, None),
		Ok(Err(e)) => (HealthStatus::Unhealthy, Some(e.to_string())),
		Err(_) => (
			HealthStatus::Unhealthy,
			Some("store health check timed out".to_string()),
		),
	};

	StoreHealth {
		status,
		backend,
		latency_ms,
		error,
	}
}

/// A failing transport degrades the service rather than failing it: the
/// dispatcher records failed attempts and retries on the next run.
pub async fn check_email(transport: &Arc<dyn EmailTransport>) -> EmailHealth {
	let start = Instant::now();
	let result = timeout(EMAIL_CHECK_TIMEOUT, transport.check_health()).await;
	let latency_ms = start.elapsed().as_millis() as u64;

	let (status, error) = match result {
		Ok(Ok(())) => (HealthStatus::Healthy, None),
		Ok(Err(e)) => (HealthStatus::Degraded, Some(e.to_string())),
		Err(_) => (
			HealthStatus::Degraded,
			Some("email health check timed out".to_string()),
		),
	};

	EmailHealth {
		status,
		transport: transport.name(),
		latency_ms,
		error,
	}
}

pub async fn check_scheduler(scheduler: Option<&Arc<JobScheduler>>) -> Option<SchedulerHealth> {
	let scheduler = scheduler?;
	let health = scheduler.health_status().await;

	let failing: Vec<String> = health
		.jobs
		.iter()
		.filter(|j| j.status == HealthState::Unhealthy)
		.map(|j| j.job_id.clone())
		.collect();

	Some(SchedulerHealth {
		status: match health.status {
			HealthState::Healthy => HealthStatus::Healthy,
			HealthState::Degraded => HealthStatus::Degraded,
			HealthState::Unhealthy => HealthStatus::Unhealthy,
		},
		jobs_total: health.jobs.len(),
		jobs_failing: failing.len(),
		failing_jobs: if failing.is_empty() { None } else { Some(failing) },
	})
}

pub fn aggregate_status(components: &HealthComponents) -> HealthStatus {
	let mut statuses = vec![components.store.status, components.email.status];
	if let Some(ref scheduler) = components.scheduler {
		statuses.push(scheduler.status);
	}

	if statuses.contains(&HealthStatus::Unhealthy) {
		HealthStatus::Unhealthy
	} else if statuses.contains(&HealthStatus::Degraded) {
		HealthStatus::Degraded
	} else {
		HealthStatus::Healthy
	}
}
