// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::context::{CancellationToken, JobContext};
use crate::error::{JobError, Result};
use crate::health::{
	determine_health_state, HealthState, JobHealthStatus, JobsHealthStatus, LastRunInfo,
};
use crate::job::Job;
use crate::types::{JobStatus, TriggerSource};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

#[derive(Default)]
struct RunHistory {
	last_run: Option<LastRunInfo>,
	consecutive_failures: u32,
}

impl RunHistory {
	fn record(&mut self, run: LastRunInfo) {
		match run.status {
			JobStatus::Failed => self.consecutive_failures += 1,
			JobStatus::Succeeded => self.consecutive_failures = 0,
			JobStatus::Running | JobStatus::Cancelled => {}
		}
		self.last_run = Some(run);
	}
}

struct RegisteredJob {
	job: Arc<dyn Job>,
	interval: Duration,
	cancellation_token: CancellationToken,
	history: Arc<RwLock<RunHistory>>,
}

/// Runs registered jobs on fixed intervals and keeps per-job run history for
/// health reporting.
pub struct JobScheduler {
	jobs: HashMap<String, RegisteredJob>,
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for JobScheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl JobScheduler {
	pub fn new() -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			jobs: HashMap::new(),
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	pub fn register_periodic(&mut self, job: Arc<dyn Job>, interval: Duration) {
		let id = job.id().to_string();
		self.jobs.insert(
			id,
			RegisteredJob {
				job,
				interval,
				cancellation_token: CancellationToken::new(),
				history: Arc::new(RwLock::new(RunHistory::default())),
			},
		);
	}

	#[instrument(skip(self))]
	pub async fn start(&self) -> Result<()> {
		let mut handles = self.handles.lock().await;

		for (job_id, registered) in &self.jobs {
			let job = Arc::clone(&registered.job);
			let history = Arc::clone(&registered.history);
			let mut shutdown_rx = self.shutdown_tx.subscribe();
			let cancellation_token = registered.cancellation_token.clone();
			let interval = registered.interval;
			let job_id = job_id.clone();

			let handle = tokio::spawn(async move {
				loop {
					tokio::select! {
						_ = tokio::time::sleep(interval) => {
							if cancellation_token.is_cancelled() {
								continue;
							}
							let _ = run_job(&job, &history, &cancellation_token).await;
						}
						_ = shutdown_rx.recv() => {
							info!(job_id = %job_id, "Shutting down periodic job");
							break;
						}
					}
				}
			});

			handles.push(handle);
		}

		info!(job_count = handles.len(), "Job scheduler started");
		Ok(())
	}

	/// Cancels every job, stops the interval loops and waits for them to exit.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		for registered in self.jobs.values() {
			registered.cancellation_token.cancel();
		}
		let _ = self.shutdown_tx.send(());

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		info!("Job scheduler shut down");
	}

	pub async fn job_status(&self, job_id: &str) -> Option<JobHealthStatus> {
		let registered = self.jobs.get(job_id)?;
		let history = registered.history.read().await;

		Some(JobHealthStatus {
			job_id: job_id.to_string(),
			name: registered.job.name().to_string(),
			status: determine_health_state(history.last_run.as_ref(), history.consecutive_failures),
			last_run: history.last_run.clone(),
			consecutive_failures: history.consecutive_failures,
		})
	}

	pub async fn health_status(&self) -> JobsHealthStatus {
		let mut jobs = Vec::new();
		let mut worst_state = HealthState::Healthy;

		for job_id in self.jobs.keys() {
			if let Some(status) = self.job_status(job_id).await {
				worst_state = worst_state.worst(status.status);
				jobs.push(status);
			}
		}

		JobsHealthStatus {
			status: worst_state,
			jobs,
		}
	}
}

async fn run_job(
	job: &Arc<dyn Job>,
	history: &RwLock<RunHistory>,
	cancellation_token: &CancellationToken,
) -> Result<String> {
	let mut ctx = JobContext::new(TriggerSource::Schedule);
	ctx.cancellation_token = cancellation_token.clone();
	let run_id = ctx.run_id.clone();
	let started_at = Utc::now();

	let result = job.run(&ctx).await;
	let duration_ms = Some((Utc::now() - started_at).num_milliseconds());

	let (status, error) = match &result {
		Ok(_) => {
			info!(job_id = %job.id(), run_id = %run_id, "Job completed successfully");
			(JobStatus::Succeeded, None)
		}
		Err(JobError::Cancelled) => {
			info!(job_id = %job.id(), run_id = %run_id, "Job cancelled");
			(JobStatus::Cancelled, None)
		}
		Err(e) => {
			warn!(job_id = %job.id(), run_id = %run_id, error = %e, "Job failed");
			(JobStatus::Failed, Some(e.to_string()))
		}
	};

	history.write().await.record(LastRunInfo {
		run_id: run_id.clone(),
		status,
		triggered_by: ctx.triggered_by,
		started_at,
		duration_ms,
		error,
	});

	result.map(|_| run_id)
}
