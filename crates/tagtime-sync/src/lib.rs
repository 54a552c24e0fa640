// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Goal synchronisation for TagTime.
//!
//! A tag edit becomes a [`WorkItem`] on the [`SyncQueue`]. The queue runs the
//! [`SyncEngine`] once per item, serially per sample, and reschedules items
//! that hit retryable remote failures according to the [`RetryPolicy`]. Each
//! remote point operation goes through the [`SessionBridge`], which turns the
//! callback-driven session into a bounded sequential call.

pub mod bridge;
pub mod engine;
pub mod outcome;
pub mod queue;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use tagtime_config::model::SyncConfig;
use tagtime_core::{GoalStore, NotificationSink, SampleStore, SessionConnector};
use tokio_util::sync::CancellationToken;

pub use bridge::{PointRequest, SessionBridge};
pub use engine::{ReconcileReport, SyncEngine, WorkItem, point_comment, point_value};
pub use outcome::{Operation, OperationOutcome, classify};
pub use queue::{QueueStats, SyncQueue};
pub use retry::{RetryDecision, RetryPolicy};

/// Wires an engine and its queue from configuration.
pub fn build_queue(
    config: &SyncConfig,
    samples: Arc<dyn SampleStore>,
    goals: Arc<dyn GoalStore>,
    notifier: Arc<dyn NotificationSink>,
    connector: Arc<dyn SessionConnector>,
    cancel: CancellationToken,
) -> SyncQueue {
    let bridge = SessionBridge::new(
        connector,
        Duration::from_secs(config.handshake_timeout_secs),
    );
    let engine = SyncEngine::new(
        samples,
        goals,
        notifier,
        bridge,
        RetryPolicy::from_config(config),
    );
    SyncQueue::new(engine, config, cancel)
}
