// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits for TagTime.
//!
//! The scheduler and the sync engine only see these traits. Persistence,
//! the remote transport, notification delivery and wall-clock time are
//! injected through constructors, which keeps every component testable
//! against in-memory fakes.

pub mod clock;
pub mod notify;
pub mod session;
pub mod storage;

pub use clock::{Clock, SystemClock, WakeAlarm};
pub use notify::NotificationSink;
pub use session::{RemoteGoalSession, SessionConnector, SessionListener};
pub use storage::{GoalStore, SampleStore, ScheduleStore};
