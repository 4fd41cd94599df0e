// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outbound email configuration.

use quiet_common_secret::SecretString;
use serde::{Deserialize, Serialize};

use super::smtp::{SmtpConfig, SmtpConfigLayer};
use crate::error::ConfigError;

pub const DEFAULT_EMAIL_ENDPOINT: &str = "https://api.resend.com/emails";
pub const DEFAULT_FROM: &str = "Quiet Hours <noreply@quiet-hours.app>";
pub const DEFAULT_SUBJECT: &str = "\u{23F0} Quiet Hours Reminder";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
	#[default]
	Resend,
	Smtp,
}

impl EmailProvider {
	pub fn from_str_value(value: &str) -> Result<Self, ConfigError> {
		match value.to_lowercase().as_str() {
			"resend" => Ok(EmailProvider::Resend),
			"smtp" => Ok(EmailProvider::Smtp),
			_ => Err(ConfigError::InvalidValue {
				key: "email.provider".to_string(),
				message: format!("'{value}' is not one of: resend, smtp"),
			}),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailConfigLayer {
	pub provider: Option<EmailProvider>,
	#[serde(skip_serializing)]
	pub api_key: Option<SecretString>,
	pub endpoint: Option<String>,
	pub from: Option<String>,
	pub subject: Option<String>,
	pub request_timeout_secs: Option<u64>,
}

impl EmailConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.provider.is_some() {
			self.provider = other.provider;
		}
		if other.api_key.is_some() {
			self.api_key = other.api_key;
		}
		if other.endpoint.is_some() {
			self.endpoint = other.endpoint;
		}
		if other.from.is_some() {
			self.from = other.from;
		}
		if other.subject.is_some() {
			self.subject = other.subject;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
	}

	/// Resolve the email section. The SMTP layer is only consulted when the
	/// provider is `smtp`.
	pub fn finalize(self, smtp: SmtpConfigLayer) -> Result<EmailConfig, ConfigError> {
		let transport = match self.provider.unwrap_or_default() {
			EmailProvider::Resend => {
				let api_key = self
					.api_key
					.filter(|k| !k.is_blank())
					.ok_or_else(|| ConfigError::Missing("email.api_key".to_string()))?;
				EmailTransportConfig::Resend {
					endpoint: self
						.endpoint
						.unwrap_or_else(|| DEFAULT_EMAIL_ENDPOINT.to_string()),
					api_key,
				}
			}
			EmailProvider::Smtp => EmailTransportConfig::Smtp(smtp.finalize()?),
		};

		Ok(EmailConfig {
			transport,
			from: self.from.unwrap_or_else(|| DEFAULT_FROM.to_string()),
			subject: self.subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
			request_timeout_secs: self
				.request_timeout_secs
				.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
		})
	}
}

#[derive(Debug, Clone)]
pub enum EmailTransportConfig {
	Resend {
		endpoint: String,
		api_key: SecretString,
	},
	Smtp(SmtpConfig),
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
	pub transport: EmailTransportConfig,
	pub from: String,
	pub subject: String,
	pub request_timeout_secs: u64,
}

impl EmailConfig {
	pub fn provider(&self) -> EmailProvider {
		match self.transport {
			EmailTransportConfig::Resend { .. } => EmailProvider::Resend,
			EmailTransportConfig::Smtp(_) => EmailProvider::Smtp,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_resend_requires_api_key() {
		let err = EmailConfigLayer::default()
			.finalize(SmtpConfigLayer::default())
			.unwrap_err();
		assert!(matches!(err, ConfigError::Missing(ref key) if key == "email.api_key"));
	}

	#[test]
	fn test_blank_api_key_rejected() {
		let layer = EmailConfigLayer {
			api_key: Some(SecretString::new("   ".to_string())),
			..Default::default()
		};
		assert!(layer.finalize(SmtpConfigLayer::default()).is_err());
	}

	#[test]
	fn test_resend_defaults() {
		let layer = EmailConfigLayer {
			api_key: Some(SecretString::new("re_123".to_string())),
			..Default::default()
		};
		let config = layer.finalize(SmtpConfigLayer::default()).unwrap();
		assert_eq!(config.provider(), EmailProvider::Resend);
		assert_eq!(config.from, DEFAULT_FROM);
		assert_eq!(config.subject, "\u{23F0} Quiet Hours Reminder");
		assert_eq!(config.request_timeout_secs, 30);
		match config.transport {
			EmailTransportConfig::Resend { endpoint, .. } => {
				assert_eq!(endpoint, DEFAULT_EMAIL_ENDPOINT)
			}
			other => panic!("unexpected transport {other:?}"),
		}
	}

	#[test]
	fn test_smtp_provider_ignores_api_key() {
		let layer = EmailConfigLayer {
			provider: Some(EmailProvider::Smtp),
			..Default::default()
		};
		let smtp = SmtpConfigLayer {
			host: Some("localhost".to_string()),
			port: Some(1025),
			..Default::default()
		};
		let config = layer.finalize(smtp).unwrap();
		assert_eq!(config.provider(), EmailProvider::Smtp);
	}
}
