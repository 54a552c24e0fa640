// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manually driven clock and a wake-up alarm that records what it was armed for.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use tagtime_core::{Clock, WakeAlarm};

/// A [`Clock`] that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A [`WakeAlarm`] that records every arm call.
#[derive(Debug, Default)]
pub struct RecordingAlarm {
    armed: Mutex<Vec<i64>>,
}

impl RecordingAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently armed time.
    pub fn last(&self) -> Option<i64> {
        self.armed.lock().unwrap().last().copied()
    }

    pub fn history(&self) -> Vec<i64> {
        self.armed.lock().unwrap().clone()
    }
}

impl WakeAlarm for RecordingAlarm {
    fn arm(&self, at: i64) {
        self.armed.lock().unwrap().push(at);
    }
}
