// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage access for the Quiet Hours notification dispatcher.
//!
//! The dispatcher needs exactly three operations from the block store: a
//! filtered read of due blocks, a compare-and-set on the `notified` flag, and
//! an append to the notification log. They are expressed by [`BlockStore`] and
//! [`NotificationStore`] and implemented twice: over SQLite ([`BlockRepository`],
//! [`NotificationRepository`]) and over a PostgREST API ([`PostgrestStore`]).

pub mod block;
pub mod error;
pub mod notification;
pub mod pool;
pub mod postgrest;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use block::{BlockRepository, BlockStore};
pub use error::{DbError, Result};
pub use notification::{NotificationRepository, NotificationStore};
pub use pool::{create_pool, run_migrations};
pub use postgrest::PostgrestStore;
pub use types::{
	format_timestamp, DueBlock, NewBlock, NewProfile, NotificationAttempt, NotificationStatus,
};
