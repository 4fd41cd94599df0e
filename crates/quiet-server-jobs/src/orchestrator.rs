// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The dispatch run: authorize, fetch, then send and record per candidate.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use quiet_common_secret::SecretString;
use quiet_server_db::DbError;
use quiet_server_email::{DispatchResult, EmailDispatcher, ReminderRequest};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::context::JobContext;
use crate::error::JobError;
use crate::fetcher::{Candidate, CandidateFetcher};
use crate::job::Job;
use crate::recorder::{OutcomeRecorder, RecordOutcome};
use crate::types::{JobOutput, TriggerSource};
use crate::window::{ReminderWindow, REMINDER_LEAD};

pub const DISPATCH_JOB_ID: &str = "notification-dispatch";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CandidateOutcome {
	Sent { attempts: u32, flipped: bool },
	Failed { attempts: u32, error: String },
	Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateReport {
	pub block_id: String,
	#[serde(flatten)]
	pub outcome: CandidateOutcome,
	/// Set when the recorder's own writes failed for this candidate.
	pub record_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
	pub run_id: String,
	pub window_start: DateTime<Utc>,
	pub window_end: DateTime<Utc>,
	/// Rows the fetch returned, including skipped ones.
	pub candidates: usize,
	pub sent: usize,
	pub failed: usize,
	pub skipped: usize,
	pub record_errors: usize,
	#[serde(skip)]
	pub reports: Vec<CandidateReport>,
}

impl RunSummary {
	fn from_reports(run_id: String, window: &ReminderWindow, reports: Vec<CandidateReport>) -> Self {
		let mut summary = RunSummary {
			run_id,
			window_start: window.start,
			window_end: window.end,
			candidates: reports.len(),
			sent: 0,
			failed: 0,
			skipped: 0,
			record_errors: 0,
			reports,
		};
		for report in &summary.reports {
			match report.outcome {
				CandidateOutcome::Sent { .. } => summary.sent += 1,
				CandidateOutcome::Failed { .. } => summary.failed += 1,
				CandidateOutcome::Skipped { .. } => summary.skipped += 1,
			}
			if report.record_error.is_some() {
				summary.record_errors += 1;
			}
		}
		summary
	}

	pub fn is_empty(&self) -> bool {
		self.candidates == 0
	}

	pub fn report(&self, block_id: &str) -> Option<&CandidateReport> {
		self.reports.iter().find(|r| r.block_id == block_id)
	}
}

/// Terminal state of one trigger.
#[derive(Debug)]
pub enum RunOutcome {
	/// Bad or missing trigger secret. Nothing was read or written.
	Rejected,
	/// The candidate fetch failed. Nothing was sent or written.
	Aborted { run_id: String, error: DbError },
	Completed(RunSummary),
}

pub struct NotificationDispatchJob {
	fetcher: CandidateFetcher,
	dispatcher: EmailDispatcher,
	recorder: OutcomeRecorder,
	cron_secret: SecretString,
	lead: Duration,
	concurrency: usize,
}

impl NotificationDispatchJob {
	pub fn new(
		fetcher: CandidateFetcher,
		dispatcher: EmailDispatcher,
		recorder: OutcomeRecorder,
		cron_secret: SecretString,
	) -> Self {
		Self {
			fetcher,
			dispatcher,
			recorder,
			cron_secret,
			lead: REMINDER_LEAD,
			concurrency: 1,
		}
	}

	pub fn with_lead(mut self, lead: Duration) -> Self {
		self.lead = lead;
		self
	}

	/// Candidates processed at once. Values below 1 are treated as 1.
	pub fn with_concurrency(mut self, concurrency: usize) -> Self {
		self.concurrency = concurrency.max(1);
		self
	}

	/// Entry point for the HTTP trigger. The presented secret is checked before
	/// any store access.
	pub async fn trigger(&self, presented: Option<&str>) -> RunOutcome {
		let authorized = presented.is_some_and(|secret| self.cron_secret.matches(secret));
		if !authorized {
			warn!(
				secret_present = presented.is_some(),
				"rejecting dispatch trigger with invalid secret"
			);
			return RunOutcome::Rejected;
		}
		self.execute(&JobContext::new(TriggerSource::Http)).await
	}

	/// Run without the secret check, for the scheduler and `run-once`.
	pub async fn execute(&self, ctx: &JobContext) -> RunOutcome {
		self.execute_at(ctx, Utc::now()).await
	}

	#[instrument(skip(self, ctx), fields(run_id = %ctx.run_id, triggered_by = ctx.triggered_by.as_str()))]
	pub async fn execute_at(&self, ctx: &JobContext, now: DateTime<Utc>) -> RunOutcome {
		let window = ReminderWindow::with_lead(now, self.lead);

		let fetched = match self.fetcher.fetch(&window).await {
			Ok(fetched) => fetched,
			Err(e) => {
				error!(error = %e, "candidate fetch failed, aborting run");
				return RunOutcome::Aborted {
					run_id: ctx.run_id.clone(),
					error: e,
				};
			}
		};

		let mut reports: Vec<CandidateReport> = fetched
			.skipped
			.into_iter()
			.map(|skipped| CandidateReport {
				block_id: skipped.block_id,
				outcome: CandidateOutcome::Skipped {
					reason: skipped.reason,
				},
				record_error: None,
			})
			.collect();

		let pending: Vec<_> = fetched
			.candidates
			.iter()
			.map(|candidate| self.process(candidate))
			.collect();
		let processed: Vec<CandidateReport> = stream::iter(pending)
			.buffer_unordered(self.concurrency)
			.collect()
			.await;
		reports.extend(processed);

		let summary = RunSummary::from_reports(ctx.run_id.clone(), &window, reports);
		info!(
			candidates = summary.candidates,
			sent = summary.sent,
			failed = summary.failed,
			skipped = summary.skipped,
			record_errors = summary.record_errors,
			"dispatch run complete"
		);
		RunOutcome::Completed(summary)
	}

	async fn process(&self, candidate: &Candidate) -> CandidateReport {
		let request = ReminderRequest {
			block_id: &candidate.block_id,
			to: &candidate.email,
			full_name: candidate.full_name.as_deref(),
			title: &candidate.title,
			start_time: candidate.start_time,
		};
		let result = self.dispatcher.dispatch(&request).await;
		let recorded = self.recorder.record(candidate, &result, Utc::now()).await;

		let (outcome, record_error) = match (result, recorded) {
			(DispatchResult::Sent { attempts, .. }, Ok(RecordOutcome::Sent { flipped })) => {
				(CandidateOutcome::Sent { attempts, flipped }, None)
			}
			(DispatchResult::Failed { attempts, error }, Ok(_)) => {
				warn!(block_id = %candidate.block_id, attempts, error = %error, "reminder delivery failed");
				(CandidateOutcome::Failed { attempts, error }, None)
			}
			(result, recorded) => {
				let record_error = recorded.err().map(|e| e.to_string());
				if let Some(e) = &record_error {
					error!(block_id = %candidate.block_id, error = %e, "failed to record dispatch outcome");
				}
				let outcome = match result {
					DispatchResult::Sent { attempts, .. } => CandidateOutcome::Sent {
						attempts,
						flipped: false,
					},
					DispatchResult::Failed { attempts, error } => {
						CandidateOutcome::Failed { attempts, error }
					}
				};
				(outcome, record_error)
			}
		};

		CandidateReport {
			block_id: candidate.block_id.clone(),
			outcome,
			record_error,
		}
	}
}

#[async_trait]
impl Job for NotificationDispatchJob {
	fn id(&self) -> &str {
		DISPATCH_JOB_ID
	}

	fn name(&self) -> &str {
		"Reminder dispatch"
	}

	fn description(&self) -> &str {
		"Emails owners of study blocks starting within the reminder lead time"
	}

	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		if ctx.cancellation_token.is_cancelled() {
			return Err(JobError::Cancelled);
		}
		match self.execute(ctx).await {
			RunOutcome::Completed(summary) => Ok(JobOutput {
				message: format!(
					"sent {} failed {} skipped {}",
					summary.sent, summary.failed, summary.skipped
				),
				metadata: serde_json::to_value(&summary).ok(),
			}),
			RunOutcome::Aborted { error, .. } => Err(JobError::Fetch(error)),
			RunOutcome::Rejected => Err(JobError::Unauthorized),
		}
	}
}
