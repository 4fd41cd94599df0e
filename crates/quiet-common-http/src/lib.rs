// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Quiet Hours.
//!
//! This crate provides:
//! - A pre-configured HTTP client with a consistent User-Agent header
//! - A bounded retry loop used by the email dispatcher

mod client;
mod retry;

pub use client::{builder, new_client_with_timeout, user_agent};
pub use retry::{retry, RetryExhausted, RetryPolicy};
