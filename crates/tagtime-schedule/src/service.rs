// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduler service: catches up missed pings, records due pings, and arms
//! the next wake-up.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};

use tagtime_config::model::ScheduleConfig;
use tagtime_core::{
    Clock, Notification, NotificationSink, OFF_TAG, SampleId, SampleStore, ScheduleState,
    ScheduleStore, TagSet, TagTimeError, WakeAlarm,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::rng;

/// Delay before the next attempt after a storage failure.
pub const STORAGE_RETRY_SECS: i64 = 60;

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not yet activated.
    Idle,
    /// Recording due pings.
    CatchingUp,
    /// Waiting for the armed wake-up.
    Armed,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::CatchingUp => write!(f, "catching-up"),
            SchedulerState::Armed => write!(f, "armed"),
        }
    }
}

/// What one activation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Samples recorded, oldest first.
    pub recorded: Vec<SampleId>,
    /// How many of them were missed pings tagged `OFF`.
    pub retro: usize,
    /// How many of them triggered a new-sample notification.
    pub prompted: usize,
    /// The ping the wake-up is armed for.
    pub next_timestamp: i64,
}

/// Orchestrates the generator, the schedule store and the sample store.
///
/// Activations are serialized: a second caller waits until the running one
/// finishes.
pub struct SchedulerService {
    config: ScheduleConfig,
    schedule: Arc<dyn ScheduleStore>,
    samples: Arc<dyn SampleStore>,
    notifier: Arc<dyn NotificationSink>,
    alarm: Arc<dyn WakeAlarm>,
    clock: Arc<dyn Clock>,
    activation: Mutex<()>,
    state: StdMutex<SchedulerState>,
}

impl SchedulerService {
    pub fn new(
        config: ScheduleConfig,
        schedule: Arc<dyn ScheduleStore>,
        samples: Arc<dyn SampleStore>,
        notifier: Arc<dyn NotificationSink>,
        alarm: Arc<dyn WakeAlarm>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            schedule,
            samples,
            notifier,
            alarm,
            clock,
            activation: Mutex::new(()),
            state: StdMutex::new(SchedulerState::Idle),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(SchedulerState::Idle)
    }

    fn set_state(&self, next: SchedulerState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    /// Runs one activation (boot, alarm fire, or explicit start).
    ///
    /// The wake-up is always re-armed, including after a storage failure, in
    /// which case the error is returned after arming.
    pub async fn activate(&self) -> Result<ActivationReport, TagTimeError> {
        let _guard = self.activation.lock().await;
        self.set_state(SchedulerState::CatchingUp);

        let result = self.catch_up().await;
        match &result {
            Ok(report) => {
                self.alarm.arm(report.next_timestamp);
                if !report.recorded.is_empty() {
                    info!(
                        recorded = report.recorded.len(),
                        retro = report.retro,
                        prompted = report.prompted,
                        next_timestamp = report.next_timestamp,
                        "scheduler caught up"
                    );
                } else {
                    debug!(next_timestamp = report.next_timestamp, "scheduler armed");
                }
            }
            Err(e) => error!(error = %e, "scheduler activation aborted"),
        }

        self.set_state(SchedulerState::Armed);
        result
    }

    /// The persisted state, or a reconstructed one when absent or corrupt.
    async fn load_state(&self, now: i64) -> Result<ScheduleState, TagTimeError> {
        let gap = self.config.gap_minutes;
        match self.schedule.load_schedule().await? {
            Some(state) if rng::is_valid(&state) => {
                if state.gap_minutes != gap {
                    info!(
                        old_gap = state.gap_minutes,
                        new_gap = gap,
                        "gap changed, applying to future pings"
                    );
                    let updated = ScheduleState {
                        gap_minutes: gap,
                        ..state
                    };
                    self.schedule.save_schedule(&updated).await?;
                    return Ok(updated);
                }
                Ok(state)
            }
            stored => {
                if stored.is_some() {
                    warn!("persisted schedule state is corrupt, rebuilding from epoch");
                }
                let state = rng::reconstruct(now, gap);
                info!(next_timestamp = state.next_timestamp, "schedule reconstructed");
                self.schedule.save_schedule(&state).await?;
                Ok(state)
            }
        }
    }

    async fn catch_up(&self) -> Result<ActivationReport, TagTimeError> {
        let started = self.clock.now();
        let mut state = match self.load_state(started).await {
            Ok(state) => state,
            Err(e) => {
                self.alarm.arm(started + STORAGE_RETRY_SECS);
                return Err(e);
            }
        };

        let mut report = ActivationReport::default();
        let threshold = i64::try_from(self.config.retro_threshold_secs).unwrap_or(i64::MAX);

        loop {
            let now = self.clock.now();
            if state.next_timestamp > now {
                break;
            }
            let due = state.next_timestamp;
            let retro = due < now.saturating_sub(threshold);
            let prompt = !retro && self.config.prompt;
            let tags = if prompt { TagSet::new() } else { TagSet::off() };

            let advanced = rng::step(&state);
            let recorded = async {
                let id = self
                    .samples
                    .create_sample(due, &tags, state.gap_minutes)
                    .await?;
                self.schedule.save_schedule(&advanced).await?;
                Ok::<_, TagTimeError>(id)
            }
            .await;

            let sample_id = match recorded {
                Ok(id) => id,
                Err(e) => {
                    // On-disk state still points at `due`; the next attempt
                    // re-records it idempotently.
                    self.alarm.arm(now + STORAGE_RETRY_SECS);
                    return Err(e);
                }
            };

            report.recorded.push(sample_id);
            if prompt {
                report.prompted += 1;
                self.notify_new_sample(sample_id, due).await;
            } else {
                if retro {
                    report.retro += 1;
                }
                debug!(sample_id = %sample_id, timestamp = due, retro, "recorded ping as OFF");
            }
            state = advanced;
        }

        report.next_timestamp = state.next_timestamp;
        Ok(report)
    }

    async fn notify_new_sample(&self, sample_id: SampleId, timestamp: i64) {
        let suggested_tags = match self.samples.tag_usage_counts().await {
            Ok(counts) => top_tags(counts, self.config.quick_tags),
            Err(e) => {
                warn!(error = %e, "could not load tag usage, notifying without suggestions");
                Vec::new()
            }
        };
        self.notifier.notify(Notification::NewSample {
            sample_id,
            timestamp,
            suggested_tags,
        });
    }

    /// The next `count` pings from the persisted (or reconstructed) state.
    pub async fn upcoming(&self, count: usize) -> Result<Vec<i64>, TagTimeError> {
        let state = match self.schedule.load_schedule().await? {
            Some(state) if rng::is_valid(&state) => ScheduleState {
                gap_minutes: self.config.gap_minutes,
                ..state
            },
            _ => rng::reconstruct(self.clock.now(), self.config.gap_minutes),
        };
        Ok(rng::upcoming(&state).take(count).collect())
    }
}

/// Most used tags, highest count first, ties broken alphabetically.
/// The `OFF` sentinel is never suggested.
pub fn top_tags(counts: HashMap<String, u64>, limit: usize) -> Vec<String> {
    let mut ranked: Vec<(String, u64)> = counts
        .into_iter()
        .filter(|(tag, _)| tag != OFF_TAG)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(tag, _)| tag).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_tags_ranks_by_count_then_name() {
        let counts = HashMap::from([
            ("work".to_string(), 10),
            ("OFF".to_string(), 50),
            ("eat".to_string(), 3),
            ("code".to_string(), 10),
            ("sleep".to_string(), 7),
        ]);
        assert_eq!(top_tags(counts, 3), vec!["code", "work", "sleep"]);
    }

    #[test]
    fn top_tags_handles_short_lists() {
        let counts = HashMap::from([("work".to_string(), 1)]);
        assert_eq!(top_tags(counts, 3), vec!["work"]);
        assert!(top_tags(HashMap::new(), 3).is_empty());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn corrupt_state_is_logged_and_rebuilt() {
        use tagtime_test_utils::{ManualClock, MemoryStore, RecordingAlarm, RecordingNotifier};

        let store = Arc::new(MemoryStore::new());
        store.put_schedule(ScheduleState {
            seed: 0,
            next_timestamp: 1,
            gap_minutes: 45,
        });
        let service = SchedulerService::new(
            ScheduleConfig::default(),
            store.clone(),
            store.clone(),
            Arc::new(RecordingNotifier::new()),
            Arc::new(RecordingAlarm::new()),
            Arc::new(ManualClock::new(1_700_000_000)),
        );

        service.activate().await.unwrap();
        assert!(logs_contain("corrupt"));
        assert_eq!(store.schedule(), Some(rng::reconstruct(1_700_000_000, 45)));
    }

    #[test]
    fn state_display() {
        assert_eq!(SchedulerState::CatchingUp.to_string(), "catching-up");
        assert_eq!(SchedulerState::Armed.to_string(), "armed");
    }
}
