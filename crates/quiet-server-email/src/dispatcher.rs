// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Render-and-send with a bounded attempt budget.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiet_common_http::{retry, RetryExhausted, RetryPolicy};
use tracing::{info, instrument};

use crate::template::ReminderTemplate;
use crate::transport::{EmailMessage, EmailTransport};

/// The facts needed to remind one recipient about one block.
#[derive(Debug, Clone, Copy)]
pub struct ReminderRequest<'a> {
	pub block_id: &'a str,
	pub to: &'a str,
	pub full_name: Option<&'a str>,
	pub title: &'a str,
	pub start_time: DateTime<Utc>,
}

/// Final outcome of dispatching one reminder in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
	Sent {
		attempts: u32,
		provider_message_id: Option<String>,
	},
	Failed {
		attempts: u32,
		error: String,
	},
}

impl DispatchResult {
	pub fn attempts(&self) -> u32 {
		match self {
			DispatchResult::Sent { attempts, .. } | DispatchResult::Failed { attempts, .. } => {
				*attempts
			}
		}
	}

	pub fn is_sent(&self) -> bool {
		matches!(self, DispatchResult::Sent { .. })
	}
}

/// Sends reminders through a transport, retrying every failure until the
/// policy's attempt budget is spent. Persists nothing.
#[derive(Clone)]
pub struct EmailDispatcher {
	transport: Arc<dyn EmailTransport>,
	template: ReminderTemplate,
	from: String,
	policy: RetryPolicy,
}

impl EmailDispatcher {
	pub fn new(
		transport: Arc<dyn EmailTransport>,
		template: ReminderTemplate,
		from: impl Into<String>,
		policy: RetryPolicy,
	) -> Self {
		Self {
			transport,
			template,
			from: from.into(),
			policy,
		}
	}

	pub fn render(&self, request: &ReminderRequest<'_>) -> EmailMessage {
		let rendered = self
			.template
			.render(request.full_name, request.title, request.start_time);
		EmailMessage {
			from: self.from.clone(),
			to: request.to.to_string(),
			subject: rendered.subject,
			html: rendered.html,
			text: rendered.text,
		}
	}

	#[instrument(
		skip(self, request),
		fields(block_id = %request.block_id, to = %request.to, transport = self.transport.name())
	)]
	pub async fn dispatch(&self, request: &ReminderRequest<'_>) -> DispatchResult {
		let message = self.render(request);

		let outcome = retry(&self.policy, |_attempt| {
			let transport = Arc::clone(&self.transport);
			let message = &message;
			async move { transport.send(message).await }
		})
		.await;

		match outcome {
			Ok((receipt, attempts)) => {
				info!(
					attempts,
					provider_message_id = receipt.provider_message_id.as_deref().unwrap_or(""),
					"reminder accepted by provider"
				);
				DispatchResult::Sent {
					attempts,
					provider_message_id: receipt.provider_message_id,
				}
			}
			Err(RetryExhausted {
				attempts,
				last_error,
			}) => DispatchResult::Failed {
				attempts,
				error: last_error.to_string(),
			},
		}
	}
}
