// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The reminder email body.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

const START_TIME_FORMAT: &str = "%a, %b %-d %Y at %-I:%M %p %Z";

/// Rendered subject and bodies for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
	pub subject: String,
	pub html: String,
	pub text: String,
}

/// Fixed reminder template with a configurable subject and display timezone.
#[derive(Debug, Clone)]
pub struct ReminderTemplate {
	subject: String,
	timezone: Tz,
}

impl ReminderTemplate {
	pub fn new(subject: impl Into<String>, timezone: Tz) -> Self {
		Self {
			subject: subject.into(),
			timezone,
		}
	}

	pub fn format_start_time(&self, start_time: DateTime<Utc>) -> String {
		start_time
			.with_timezone(&self.timezone)
			.format(START_TIME_FORMAT)
			.to_string()
	}

	pub fn render(
		&self,
		full_name: Option<&str>,
		title: &str,
		start_time: DateTime<Utc>,
	) -> RenderedEmail {
		let greeting = match full_name.map(str::trim).filter(|n| !n.is_empty()) {
			Some(name) => format!("Hello {},", escape_html(name)),
			None => "Hello there,".to_string(),
		};
		let text_greeting = match full_name.map(str::trim).filter(|n| !n.is_empty()) {
			Some(name) => format!("Hello {name},"),
			None => "Hello there,".to_string(),
		};
		let when = self.format_start_time(start_time);

		let html = format!(
			r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Quiet Hours Reminder</title>
  <style>
    body {{ font-family: 'Segoe UI', Roboto, sans-serif; background:#f4f6f8; margin:0; padding:0; color:#333; }}
    .container {{ max-width:600px; margin:20px auto; background:#fff; border-radius:12px; overflow:hidden; }}
    .header {{ background:#4f46e5; color:#fff; padding:20px; text-align:center; font-size:24px; font-weight:bold; }}
    .content {{ padding:30px 20px; line-height:1.6; font-size:16px; }}
    .footer {{ background:#f4f6f8; text-align:center; padding:15px; font-size:12px; color:#6b7280; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header">&#x23F0; Quiet Hours Reminder</div>
    <div class="content">
      <h2>{greeting}</h2>
      <p>Your study block <strong>"{title}"</strong> is starting soon.</p>
      <p><strong>Start Time:</strong> {when}</p>
      <p>Stay focused and make the most of your quiet hours!</p>
    </div>
    <div class="footer">
      Quiet Hours<br/>
      You are receiving this email because you scheduled a study block.
    </div>
  </div>
</body>
</html>
"#,
			greeting = greeting,
			title = escape_html(title),
			when = escape_html(&when),
		);

		let text = format!(
			"{text_greeting}\n\n\
			 Your study block \"{title}\" is starting soon.\n\n\
			 Start Time: {when}\n\n\
			 Stay focused and make the most of your quiet hours!\n\n\
			 --\n\
			 Quiet Hours. You are receiving this email because you scheduled a study block.\n"
		);

		RenderedEmail {
			subject: self.subject.clone(),
			html,
			text,
		}
	}
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
	let mut out = String::with_capacity(input.len());
	for c in input.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#x27;"),
			_ => out.push(c),
		}
	}
	out
}
