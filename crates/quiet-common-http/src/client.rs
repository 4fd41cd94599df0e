// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Creates a new HTTP client builder with the standard Quiet Hours User-Agent.
///
/// Use this when you need to customize the client (e.g., set timeout).
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a client with the given request timeout.
///
/// Returns the builder error instead of panicking so callers can surface a
/// misconfigured TLS backend at startup.
pub fn new_client_with_timeout(timeout: Duration) -> Result<Client, reqwest::Error> {
	builder().timeout(timeout).build()
}

/// Returns the standard User-Agent string.
///
/// Format: `quiet-hours/{version} ({os}-{arch})`
pub fn user_agent() -> String {
	format!(
		"quiet-hours/{} ({}-{})",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_product_and_platform() {
		let ua = user_agent();
		assert!(ua.starts_with("quiet-hours/"));
		assert!(ua.contains(std::env::consts::OS));
	}

	#[test]
	fn client_builds_with_timeout() {
		assert!(new_client_with_timeout(Duration::from_secs(5)).is_ok());
	}
}
