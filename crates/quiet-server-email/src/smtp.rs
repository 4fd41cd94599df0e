// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SMTP transport built on [`lettre`].
//!
//! Sends multipart messages (plain text + HTML). Each send opens its own
//! connection.

use async_trait::async_trait;
use lettre::{
	message::{header::ContentType, Mailbox, MultiPart, SinglePart},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use quiet_server_config::{SmtpConfig, TlsMode};
use tracing::{debug, instrument};

use crate::error::{EmailError, Result};
use crate::transport::{EmailMessage, EmailTransport, SendReceipt};

pub struct SmtpTransport {
	transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
	#[instrument(
		name = "smtp_transport_new",
		skip(config),
		fields(host = %config.host, port = config.port, tls = ?config.tls)
	)]
	pub fn new(config: &SmtpConfig) -> Result<Self> {
		let builder = match config.tls {
			TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
				.map_err(|e| EmailError::Smtp(format!("{e}")))?,
			TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
				.map_err(|e| EmailError::Smtp(format!("{e}")))?,
			TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
		};

		let mut builder = builder.port(config.port);

		if let (Some(username), Some(password)) = (&config.username, &config.password) {
			let credentials = Credentials::new(username.clone(), password.expose().clone());
			builder = builder.credentials(credentials);
		}

		debug!("SMTP transport initialized");

		Ok(Self {
			transport: builder.build(),
		})
	}
}

fn build_message(message: &EmailMessage) -> Result<Message> {
	let from: Mailbox = message
		.from
		.parse()
		.map_err(|e| EmailError::Address(format!("{e}")))?;
	let to: Mailbox = message
		.to
		.parse()
		.map_err(|e| EmailError::Address(format!("{e}")))?;

	Message::builder()
		.from(from)
		.to(to)
		.subject(message.subject.as_str())
		.multipart(
			MultiPart::alternative()
				.singlepart(
					SinglePart::builder()
						.header(ContentType::TEXT_PLAIN)
						.body(message.text.clone()),
				)
				.singlepart(
					SinglePart::builder()
						.header(ContentType::TEXT_HTML)
						.body(message.html.clone()),
				),
		)
		.map_err(|e| EmailError::Smtp(format!("failed to build message: {e}")))
}

#[async_trait]
impl EmailTransport for SmtpTransport {
	fn name(&self) -> &'static str {
		"smtp"
	}

	#[instrument(name = "smtp_send", skip(self, message), fields(to = %message.to))]
	async fn send(&self, message: &EmailMessage) -> Result<SendReceipt> {
		let email = build_message(message)?;
		let response = self
			.transport
			.send(email)
			.await
			.map_err(|e| EmailError::Smtp(format!("{e}")))?;

		let provider_message_id = response.message().next().map(|line| line.to_string());
		Ok(SendReceipt {
			provider_message_id,
		})
	}

	#[instrument(name = "smtp_check_health", skip(self))]
	async fn check_health(&self) -> Result<()> {
		let reachable = self
			.transport
			.test_connection()
			.await
			.map_err(|e| EmailError::Smtp(format!("{e}")))?;
		if !reachable {
			return Err(EmailError::Smtp("server did not answer NOOP".to_string()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn message(to: &str) -> EmailMessage {
		EmailMessage {
			from: "Quiet Hours <noreply@quiet-hours.app>".to_string(),
			to: to.to_string(),
			subject: "\u{23F0} Quiet Hours Reminder".to_string(),
			html: "<p>hi</p>".to_string(),
			text: "hi".to_string(),
		}
	}

	#[test]
	fn test_build_message_multipart() {
		let built = build_message(&message("ada@example.com")).unwrap();
		let raw = String::from_utf8(built.formatted()).unwrap();
		assert!(raw.contains("multipart/alternative"));
		assert!(raw.contains("text/plain"));
		assert!(raw.contains("text/html"));
	}

	#[test]
	fn test_build_message_rejects_bad_recipient() {
		let err = build_message(&message("not-an-email")).unwrap_err();
		assert!(matches!(err, EmailError::Address(_)));
	}

	#[tokio::test]
	async fn test_transport_builds_without_connecting() {
		let config = SmtpConfig {
			host: "localhost".to_string(),
			port: 1025,
			username: None,
			password: None,
			tls: TlsMode::None,
		};
		let transport = SmtpTransport::new(&config).unwrap();
		assert_eq!(transport.name(), "smtp");
	}

	/// Accepts one connection and answers just enough SMTP for a single send.
	async fn loopback_smtp_server() -> (u16, tokio::task::JoinHandle<Vec<String>>) {
		use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		let handle = tokio::spawn(async move {
			let (stream, _) = listener.accept().await.unwrap();
			let (read, mut write) = stream.into_split();
			let mut lines = BufReader::new(read).lines();
			let mut commands = Vec::new();
			let mut in_data = false;
			write.write_all(b"220 localhost ESMTP\r\n").await.unwrap();
			while let Ok(Some(line)) = lines.next_line().await {
				if in_data {
					if line == "." {
						in_data = false;
						write
							.write_all(b"250 Ok: queued as ABC123\r\n")
							.await
							.unwrap();
					}
					continue;
				}
				let command = line.to_ascii_uppercase();
				commands.push(command.clone());
				let reply: &[u8] = if command.starts_with("EHLO") || command.starts_with("HELO") {
					b"250 localhost\r\n"
				} else if command.starts_with("DATA") {
					in_data = true;
					b"354 End data with <CR><LF>.<CR><LF>\r\n"
				} else if command.starts_with("QUIT") {
					let _ = write.write_all(b"221 Bye\r\n").await;
					break;
				} else {
					b"250 Ok\r\n"
				};
				write.write_all(reply).await.unwrap();
			}
			commands
		});
		(port, handle)
	}

	#[tokio::test]
	async fn test_send_returns_queue_id_from_server_reply() {
		let (port, server) = loopback_smtp_server().await;
		let transport = SmtpTransport::new(&SmtpConfig {
			host: "127.0.0.1".to_string(),
			port,
			username: None,
			password: None,
			tls: TlsMode::None,
		})
		.unwrap();

		let receipt = transport.send(&message("ada@example.com")).await.unwrap();

		let id = receipt.provider_message_id.unwrap();
		assert!(id.contains("ABC123"), "unexpected reply text: {id}");
		let commands = server.await.unwrap();
		assert!(commands.iter().any(|c| c.starts_with("RCPT TO:<ADA@EXAMPLE.COM>")));
	}
}
