// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The Quiet Hours reminder dispatch job.
//!
//! A run selects the reminder window ([`ReminderWindow`]), fetches due blocks
//! ([`CandidateFetcher`]), sends one reminder per candidate through the
//! [`quiet_server_email::EmailDispatcher`] and records the outcome
//! ([`OutcomeRecorder`]). [`NotificationDispatchJob`] drives the whole run
//! and can be triggered over HTTP or registered with the [`JobScheduler`].

pub mod context;
pub mod error;
pub mod fetcher;
pub mod health;
pub mod job;
pub mod orchestrator;
pub mod recorder;
pub mod scheduler;
pub mod types;
pub mod window;

#[cfg(test)]
mod testing;

pub use context::{CancellationToken, JobContext};
pub use error::{JobError, Result};
pub use fetcher::{Candidate, CandidateFetcher, FetchOutcome, SkippedBlock};
pub use health::{HealthState, JobHealthStatus, JobsHealthStatus, LastRunInfo};
pub use job::Job;
pub use orchestrator::{
	CandidateOutcome, CandidateReport, NotificationDispatchJob, RunOutcome, RunSummary,
	DISPATCH_JOB_ID,
};
pub use recorder::{OutcomeRecorder, RecordOutcome};
pub use scheduler::JobScheduler;
pub use types::{JobOutput, JobStatus, TriggerSource};
pub use window::{ReminderWindow, REMINDER_LEAD};
