// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-sample serial work queue with retry scheduling and coalescing.
//!
//! Each sample id owns a lane holding at most one pending [`WorkItem`]. A
//! lane is drained by a single worker task, so edits to one sample run one at
//! a time and in submission order while different samples run concurrently
//! (bounded by a semaphore). A newer edit replaces whatever is still pending
//! for the same sample, carrying the highest retry count seen.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tagtime_config::model::SyncConfig;
use tagtime_core::{Notification, SampleId, TagSet, TagTimeError};
use tokio::sync::{Notify, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::engine::{ReconcileReport, SyncEngine, WorkItem};
use crate::retry::RetryDecision;

struct Queued {
    item: WorkItem,
    not_before: Instant,
}

struct Lane {
    pending: Option<Queued>,
    wake: Arc<Notify>,
}

enum Next {
    Run(WorkItem),
    Wait(Instant, Arc<Notify>),
    Drained,
    Gone,
}

/// Counters for what the queue has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub completed: usize,
    pub retries: usize,
    pub gave_up: usize,
    pub dropped: usize,
}

#[derive(Default)]
struct Counters {
    completed: AtomicUsize,
    retries: AtomicUsize,
    gave_up: AtomicUsize,
    dropped: AtomicUsize,
}

struct Inner {
    engine: SyncEngine,
    enabled: bool,
    lanes: DashMap<SampleId, Lane>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    idle: Notify,
    counters: Counters,
}

/// Cloneable handle to the sync work queue.
#[derive(Clone)]
pub struct SyncQueue {
    inner: Arc<Inner>,
}

impl SyncQueue {
    pub fn new(engine: SyncEngine, config: &SyncConfig, cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                enabled: config.enabled,
                lanes: DashMap::new(),
                permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
                cancel,
                tracker: TaskTracker::new(),
                idle: Notify::new(),
                counters: Counters::default(),
            }),
        }
    }

    /// Records a tag edit and queues reconciliation of the sample.
    ///
    /// Re-submitting the current tags is allowed and is how the user retries
    /// a sample the queue gave up on.
    pub async fn edit_tags(&self, sample_id: SampleId, tags: TagSet) -> Result<(), TagTimeError> {
        let samples = self.inner.engine.samples();
        let old_tags = samples.tags_for_sample(sample_id).await?;
        samples.update_tags(sample_id, &tags).await?;
        info!(sample_id = %sample_id, old_tags = %old_tags, new_tags = %tags, "tags updated");

        if !self.inner.enabled {
            debug!(sample_id = %sample_id, "goal sync disabled, not reconciling");
            return Ok(());
        }
        self.enqueue(WorkItem::new(sample_id, old_tags, tags));
        Ok(())
    }

    /// Queues `item`, coalescing with anything still pending for the sample.
    pub fn enqueue(&self, item: WorkItem) {
        if self.inner.cancel.is_cancelled() {
            warn!(sample_id = %item.sample_id, "sync queue is shut down, edit not queued");
            return;
        }
        let sample_id = item.sample_id;
        let now = Instant::now();

        let spawn = match self.inner.lanes.entry(sample_id) {
            Entry::Occupied(mut entry) => {
                let lane = entry.get_mut();
                let merged = match lane.pending.take() {
                    Some(previous) => {
                        debug!(sample_id = %sample_id, "coalescing with pending edit");
                        WorkItem {
                            sample_id,
                            old_tags: previous.item.old_tags,
                            new_tags: item.new_tags,
                            retry_count: previous.item.retry_count.max(item.retry_count),
                        }
                    }
                    None => item,
                };
                lane.pending = Some(Queued {
                    item: merged,
                    not_before: now,
                });
                lane.wake.notify_one();
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(Lane {
                    pending: Some(Queued {
                        item,
                        not_before: now,
                    }),
                    wake: Arc::new(Notify::new()),
                });
                true
            }
        };

        if spawn {
            let inner = Arc::clone(&self.inner);
            self.inner.tracker.spawn(run_lane(inner, sample_id));
        }
    }

    /// Samples with queued or running work.
    pub fn active_lanes(&self) -> usize {
        self.inner.lanes.len()
    }

    pub fn stats(&self) -> QueueStats {
        let c = &self.inner.counters;
        QueueStats {
            completed: c.completed.load(Ordering::SeqCst),
            retries: c.retries.load(Ordering::SeqCst),
            gave_up: c.gave_up.load(Ordering::SeqCst),
            dropped: c.dropped.load(Ordering::SeqCst),
        }
    }

    /// Waits until every lane has drained, including scheduled retries.
    /// Returns early if the queue is shut down.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.lanes.is_empty() {
                return;
            }
            tokio::select! {
                _ = notified => {}
                _ = self.inner.cancel.cancelled() => return,
            }
        }
    }

    /// Cancels pending work and waits for the workers to stop. Points whose
    /// remote create was interrupted stay pending and are re-submitted by the
    /// next edit of their sample.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        info!(pending = self.inner.lanes.len(), "sync queue stopped");
    }
}

async fn run_lane(inner: Arc<Inner>, sample_id: SampleId) {
    loop {
        let next = match inner.lanes.get_mut(&sample_id) {
            Some(mut lane) => match lane.pending.take() {
                Some(queued) if queued.not_before > Instant::now() => {
                    let at = queued.not_before;
                    lane.pending = Some(queued);
                    Next::Wait(at, Arc::clone(&lane.wake))
                }
                Some(queued) => Next::Run(queued.item),
                None => Next::Drained,
            },
            None => Next::Gone,
        };

        match next {
            Next::Gone => return,
            Next::Drained => {
                // An edit may have landed since the check above; only an
                // empty lane is removed.
                if inner
                    .lanes
                    .remove_if(&sample_id, |_, lane| lane.pending.is_none())
                    .is_some()
                {
                    if inner.lanes.is_empty() {
                        inner.idle.notify_waiters();
                    }
                    return;
                }
            }
            Next::Wait(at, wake) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(at) => {}
                    _ = wake.notified() => {}
                    _ = inner.cancel.cancelled() => return,
                }
            }
            Next::Run(item) => {
                let permit = tokio::select! {
                    permit = Arc::clone(&inner.permits).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                    _ = inner.cancel.cancelled() => return,
                };
                let result = tokio::select! {
                    result = inner.engine.reconcile(&item) => result,
                    _ = inner.cancel.cancelled() => return,
                };
                drop(permit);
                settle(&inner, item, result);
            }
        }
    }
}

fn settle(inner: &Inner, item: WorkItem, result: Result<ReconcileReport, TagTimeError>) {
    let reason = match result {
        Ok(report) if !report.needs_retry() => {
            inner.counters.completed.fetch_add(1, Ordering::SeqCst);
            return;
        }
        Ok(report) => report
            .retryable
            .last()
            .map(|f| f.to_string())
            .unwrap_or_default(),
        Err(e) if e.is_storage() => e.to_string(),
        Err(e) => {
            warn!(sample_id = %item.sample_id, error = %e, "reconciliation dropped");
            inner.counters.dropped.fetch_add(1, Ordering::SeqCst);
            return;
        }
    };

    let Some(mut lane) = inner.lanes.get_mut(&item.sample_id) else {
        return;
    };
    match inner.engine.policy().decide(item.retry_count) {
        RetryDecision::Retry { delay, retry_count } => {
            inner.counters.retries.fetch_add(1, Ordering::SeqCst);
            match lane.pending.as_mut() {
                Some(newer) => {
                    newer.item.retry_count = newer.item.retry_count.max(retry_count);
                    debug!(sample_id = %item.sample_id, "retry folded into newer edit");
                }
                None => {
                    info!(
                        sample_id = %item.sample_id,
                        retry_count,
                        delay_secs = delay.as_secs(),
                        reason = %reason,
                        "reconciliation scheduled for retry"
                    );
                    lane.pending = Some(Queued {
                        item: WorkItem {
                            retry_count,
                            ..item
                        },
                        not_before: Instant::now() + delay,
                    });
                }
            }
        }
        RetryDecision::GiveUp => {
            if let Some(newer) = lane.pending.as_mut() {
                // The newer edit gets one last attempt before anyone is told.
                newer.item.retry_count = newer.item.retry_count.max(item.retry_count);
                return;
            }
            drop(lane);
            inner.counters.gave_up.fetch_add(1, Ordering::SeqCst);
            warn!(
                sample_id = %item.sample_id,
                retry_count = item.retry_count,
                reason = %reason,
                "giving up on reconciliation"
            );
            inner.engine.notifier().notify(Notification::ResubmitNeeded {
                sample_id: item.sample_id,
                reason,
            });
        }
    }
}
