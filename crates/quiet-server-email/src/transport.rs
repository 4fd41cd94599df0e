// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// A fully rendered message ready for a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
	pub from: String,
	pub to: String,
	pub subject: String,
	pub html: String,
	pub text: String,
}

/// What the provider told us when it accepted a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
	pub provider_message_id: Option<String>,
}

/// An outbound email provider.
///
/// `send` returning `Ok` means the provider accepted the message. Any error
/// is treated as transient by the dispatcher.
#[async_trait]
pub trait EmailTransport: Send + Sync {
	fn name(&self) -> &'static str;

	async fn send(&self, message: &EmailMessage) -> Result<SendReceipt>;

	async fn check_health(&self) -> Result<()> {
		Ok(())
	}
}
