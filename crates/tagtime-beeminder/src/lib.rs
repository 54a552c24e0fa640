// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Beeminder-backed remote goal session.
//!
//! Provides [`BeeminderConnector`], a
//! [`SessionConnector`](tagtime_core::SessionConnector) whose sessions
//! talk to the Beeminder REST API. Every session call returns immediately and
//! performs its HTTP request on a spawned task, reporting the outcome through
//! the session listener.

pub mod client;
pub mod session;

pub use client::{BeeminderClient, error_kind_for_status};
pub use session::{BeeminderConnector, BeeminderSession};
