// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resend-compatible HTTP transport.

use std::time::Duration;

use async_trait::async_trait;
use quiet_common_secret::SecretString;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{EmailError, Result};
use crate::transport::{EmailMessage, EmailTransport, SendReceipt};

pub const DEFAULT_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
	from: &'a str,
	to: [&'a str; 1],
	subject: &'a str,
	html: &'a str,
	text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
	id: Option<String>,
}

/// POSTs JSON to the provider's send endpoint with a bearer API key.
#[derive(Debug, Clone)]
pub struct ResendTransport {
	http_client: Client,
	endpoint: String,
	api_key: SecretString,
}

impl ResendTransport {
	pub fn new(api_key: SecretString, timeout: Duration) -> Result<Self> {
		let http_client = quiet_common_http::new_client_with_timeout(timeout)?;
		Ok(Self {
			http_client,
			endpoint: DEFAULT_ENDPOINT.to_string(),
			api_key,
		})
	}

	/// Sets a custom endpoint (self-hosted relays, tests).
	pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.endpoint = endpoint.into();
		self
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}
}

#[async_trait]
impl EmailTransport for ResendTransport {
	fn name(&self) -> &'static str {
		"resend"
	}

	#[instrument(name = "resend_send", skip(self, message), fields(to = %message.to))]
	async fn send(&self, message: &EmailMessage) -> Result<SendReceipt> {
		let body = SendRequest {
			from: &message.from,
			to: [&message.to],
			subject: &message.subject,
			html: &message.html,
			text: &message.text,
		};

		let response = self
			.http_client
			.post(&self.endpoint)
			.bearer_auth(self.api_key.expose())
			.json(&body)
			.send()
			.await?;

		let status = response.status();
		debug!(status = %status, "email provider responded");

		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(EmailError::Rejected {
				status: status.as_u16(),
				body,
			});
		}

		let text = response.text().await.unwrap_or_default();
		let provider_message_id = serde_json::from_str::<SendResponse>(&text)
			.ok()
			.and_then(|r| r.id);

		Ok(SendReceipt {
			provider_message_id,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{body_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn message() -> EmailMessage {
		EmailMessage {
			from: "Quiet Hours <noreply@quiet-hours.app>".to_string(),
			to: "ada@example.com".to_string(),
			subject: "Reminder".to_string(),
			html: "<p>hi</p>".to_string(),
			text: "hi".to_string(),
		}
	}

	fn transport(server: &MockServer) -> ResendTransport {
		ResendTransport::new(
			SecretString::new("re_test_key".to_string()),
			Duration::from_secs(5),
		)
		.unwrap()
		.with_endpoint(format!("{}/emails", server.uri()))
	}

	#[tokio::test]
	async fn test_send_posts_expected_body() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/emails"))
			.and(header("authorization", "Bearer re_test_key"))
			.and(body_json(serde_json::json!({
				"from": "Quiet Hours <noreply@quiet-hours.app>",
				"to": ["ada@example.com"],
				"subject": "Reminder",
				"html": "<p>hi</p>",
				"text": "hi"
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "msg_123" })))
			.expect(1)
			.mount(&server)
			.await;

		let receipt = transport(&server).send(&message()).await.unwrap();
		assert_eq!(receipt.provider_message_id.as_deref(), Some("msg_123"));
	}

	#[tokio::test]
	async fn test_accepts_any_2xx_without_body() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(202))
			.mount(&server)
			.await;

		let receipt = transport(&server).send(&message()).await.unwrap();
		assert!(receipt.provider_message_id.is_none());
	}

	#[tokio::test]
	async fn test_non_2xx_is_rejected_with_body() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(422).set_body_string("invalid `to` field"))
			.mount(&server)
			.await;

		let err = transport(&server).send(&message()).await.unwrap_err();
		match err {
			EmailError::Rejected { status, body } => {
				assert_eq!(status, 422);
				assert!(body.contains("invalid"));
			}
			other => panic!("unexpected error {other:?}"),
		}
	}

	#[test]
	fn test_default_endpoint() {
		let transport = ResendTransport::new(
			SecretString::new("k".to_string()),
			Duration::from_secs(1),
		)
		.unwrap();
		assert_eq!(transport.endpoint(), DEFAULT_ENDPOINT);
		assert_eq!(transport.name(), "resend");
	}
}
