// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reminder email delivery for Quiet Hours.
//!
//! [`ReminderTemplate`] renders the message, an [`EmailTransport`] hands it to
//! a provider ([`ResendTransport`] over HTTP or [`SmtpTransport`] via
//! `lettre`), and [`EmailDispatcher`] ties the two together under a bounded
//! retry budget.

pub mod dispatcher;
pub mod error;
pub mod resend;
pub mod smtp;
pub mod template;
pub mod transport;

pub use dispatcher::{DispatchResult, EmailDispatcher, ReminderRequest};
pub use error::{EmailError, Result};
pub use resend::ResendTransport;
pub use smtp::SmtpTransport;
pub use template::{RenderedEmail, ReminderTemplate};
pub use transport::{EmailMessage, EmailTransport, SendReceipt};
