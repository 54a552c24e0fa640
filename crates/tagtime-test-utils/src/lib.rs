// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for TagTime.
//!
//! Deterministic fakes for every collaborator trait, so scheduler and sync
//! tests run without a network, a real clock, or a notification daemon.
//!
//! - [`MemoryStore`] - in-memory schedule/sample/goal store with failure injection
//! - [`FakeRemote`] - scriptable remote goal service with callback delivery
//! - [`ManualClock`], [`RecordingAlarm`], [`RecordingNotifier`]
//! - [`TestHarness`] - the fakes around a temporary SQLite store

pub mod clock;
pub mod harness;
pub mod memory_store;
pub mod notifier;
pub mod remote;

pub use clock::{ManualClock, RecordingAlarm};
pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_store::MemoryStore;
pub use notifier::RecordingNotifier;
pub use remote::{FakeRemote, RemoteCall, RemotePoint, Reply};
