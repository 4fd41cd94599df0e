// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for quiet-server.

pub mod dispatch;
pub mod email;
pub mod http;
pub mod logging;
pub mod scheduler;
pub mod smtp;
pub mod store;
pub mod trigger;

pub use dispatch::{DispatchConfig, DispatchConfigLayer, MAX_REMINDER_LEAD_SECS};
pub use email::{EmailConfig, EmailConfigLayer, EmailProvider, EmailTransportConfig};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use scheduler::{SchedulerConfig, SchedulerConfigLayer};
pub use smtp::{SmtpConfig, SmtpConfigLayer, TlsMode};
pub use store::{StoreBackend, StoreConfig, StoreConfigLayer};
pub use trigger::{TriggerConfig, TriggerConfigLayer};
