// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ping scheduling for TagTime.
//!
//! [`rng`] is the pure, replayable schedule generator. [`SchedulerService`]
//! turns it into recorded samples and a wake-up time; [`AlarmTimer`] is the
//! in-process wake-up used by the daemon.

pub mod rng;
pub mod service;
pub mod timer;

pub use service::{ActivationReport, SchedulerService, SchedulerState};
pub use timer::AlarmTimer;
