// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduler activation tests against in-memory collaborators.

use std::sync::Arc;

use tagtime_config::model::ScheduleConfig;
use tagtime_core::{
    Notification, NotificationKind, OFF_TAG, SampleStore, ScheduleState, ScheduleStore, TagSet,
};
use tagtime_schedule::rng::{self, EPOCH, INITIAL_SEED};
use tagtime_schedule::{SchedulerService, SchedulerState};
use tagtime_test_utils::{ManualClock, MemoryStore, RecordingAlarm, RecordingNotifier, TestHarness};

/// Pings following the epoch for gap 45:
/// 1184097393 (epoch), 1184098754, 1184102685, 1184104776, 1184105302,
/// 1184105815, 1184108794.
const SIXTH_PING: i64 = 1_184_105_815;
const SEVENTH_PING: i64 = 1_184_108_794;

struct Fixture {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    alarm: Arc<RecordingAlarm>,
    notifier: Arc<RecordingNotifier>,
    service: Arc<SchedulerService>,
}

fn fixture(config: ScheduleConfig, now: i64) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(now));
    let alarm = Arc::new(RecordingAlarm::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let service = Arc::new(SchedulerService::new(
        config,
        store.clone(),
        store.clone(),
        notifier.clone(),
        alarm.clone(),
        clock.clone(),
    ));
    Fixture {
        store,
        clock,
        alarm,
        notifier,
        service,
    }
}

fn epoch_state() -> ScheduleState {
    ScheduleState {
        seed: INITIAL_SEED,
        next_timestamp: EPOCH,
        gap_minutes: 45,
    }
}

#[tokio::test]
async fn fresh_start_reconstructs_and_arms_without_recording() {
    let now = 1_700_000_000;
    let f = fixture(ScheduleConfig::default(), now);
    assert_eq!(f.service.state(), SchedulerState::Idle);

    let report = f.service.activate().await.unwrap();

    let expected = rng::reconstruct(now, 45);
    assert!(report.recorded.is_empty());
    assert_eq!(report.next_timestamp, expected.next_timestamp);
    assert!(report.next_timestamp > now);
    assert_eq!(f.store.schedule(), Some(expected));
    assert_eq!(f.alarm.last(), Some(expected.next_timestamp));
    assert_eq!(f.service.state(), SchedulerState::Armed);
}

#[tokio::test]
async fn catch_up_records_missed_pings_as_off_and_prompts_recent_one() {
    let now = SIXTH_PING + 30;
    let f = fixture(ScheduleConfig::default(), now);
    f.store.put_schedule(epoch_state());

    let report = f.service.activate().await.unwrap();

    assert_eq!(report.recorded.len(), 6);
    assert_eq!(report.retro, 5);
    assert_eq!(report.prompted, 1);
    assert_eq!(report.next_timestamp, SEVENTH_PING);

    let samples = f.store.samples();
    assert_eq!(samples.len(), 6);
    assert_eq!(samples[0].timestamp, EPOCH);
    for sample in &samples[..5] {
        assert_eq!(sample.tags, TagSet::off());
        assert_eq!(sample.period_minutes, 45);
    }
    assert!(samples[5].tags.is_empty());
    assert_eq!(samples[5].timestamp, SIXTH_PING);

    let notifications = f.notifier.all();
    assert_eq!(notifications.len(), 1);
    assert!(matches!(
        &notifications[0],
        Notification::NewSample { timestamp, suggested_tags, .. }
            if *timestamp == SIXTH_PING && suggested_tags.is_empty()
    ));

    let persisted = f.store.schedule().unwrap();
    assert_eq!(persisted.next_timestamp, SEVENTH_PING);
    assert_eq!(f.alarm.last(), Some(SEVENTH_PING));
}

#[tokio::test]
async fn second_activation_without_time_passing_records_nothing() {
    let f = fixture(ScheduleConfig::default(), SIXTH_PING + 30);
    f.store.put_schedule(epoch_state());

    f.service.activate().await.unwrap();
    let before = f.store.samples().len();
    let second = f.service.activate().await.unwrap();

    assert!(second.recorded.is_empty());
    assert_eq!(f.store.samples().len(), before);
    assert_eq!(f.notifier.count(NotificationKind::NewSample), 1);
}

#[tokio::test]
async fn paused_prompting_records_off_without_notifying() {
    let config = ScheduleConfig {
        prompt: false,
        ..ScheduleConfig::default()
    };
    let f = fixture(config, SIXTH_PING + 5);
    f.store.put_schedule(epoch_state());

    let report = f.service.activate().await.unwrap();

    assert_eq!(report.recorded.len(), 6);
    assert_eq!(report.prompted, 0);
    assert!(f.store.samples().iter().all(|s| s.tags.contains(OFF_TAG)));
    assert!(f.notifier.all().is_empty());
}

#[tokio::test]
async fn notification_suggests_most_used_tags() {
    let f = fixture(ScheduleConfig::default(), SIXTH_PING);
    let sixth = (0..5).fold(epoch_state(), |state, _| rng::step(&state));
    assert_eq!(sixth.next_timestamp, SIXTH_PING);
    f.store.put_schedule(sixth);
    f.store
        .create_sample(1_000, &TagSet::parse("work code"), 45)
        .await
        .unwrap();
    f.store
        .create_sample(2_000, &TagSet::parse("work eat"), 45)
        .await
        .unwrap();
    f.store
        .create_sample(3_000, &TagSet::parse("work code sleep"), 45)
        .await
        .unwrap();
    for t in 4_000..4_010 {
        f.store.create_sample(t, &TagSet::off(), 45).await.unwrap();
    }

    f.service.activate().await.unwrap();

    match f.notifier.all().as_slice() {
        [Notification::NewSample { suggested_tags, .. }] => {
            assert_eq!(suggested_tags, &vec!["work", "code", "eat"]);
        }
        other => panic!("expected one new-sample notification, got {other:?}"),
    }
}

#[tokio::test]
async fn storage_failure_aborts_but_keeps_committed_progress() {
    let now = SIXTH_PING + 30;
    let f = fixture(ScheduleConfig::default(), now);
    f.store.put_schedule(epoch_state());
    f.store.fail_sample_creates_after(2);

    let err = f.service.activate().await.unwrap_err();
    assert!(err.is_storage());
    assert_eq!(f.store.samples().len(), 2);
    // Persisted state points at the first unrecorded ping.
    assert_eq!(f.store.schedule().unwrap().next_timestamp, 1_184_102_685);
    assert_eq!(f.alarm.last(), Some(now + 60));
    assert_eq!(f.service.state(), SchedulerState::Armed);

    f.store.fail_sample_creates_after(usize::MAX);
    let report = f.service.activate().await.unwrap();
    assert_eq!(report.recorded.len(), 4);
    assert_eq!(f.store.samples().len(), 6);
    assert_eq!(f.store.schedule().unwrap().next_timestamp, SEVENTH_PING);
}

#[tokio::test]
async fn failed_state_save_never_duplicates_samples() {
    let now = SIXTH_PING + 30;
    let f = fixture(ScheduleConfig::default(), now);
    f.store.put_schedule(epoch_state());
    f.store.set_fail_schedule_save(true);

    assert!(f.service.activate().await.is_err());
    assert_eq!(f.store.samples().len(), 1);
    assert_eq!(f.store.schedule().unwrap(), epoch_state());

    f.store.set_fail_schedule_save(false);
    f.service.activate().await.unwrap();
    let stamps: Vec<i64> = f.store.samples().iter().map(|s| s.timestamp).collect();
    let mut deduped = stamps.clone();
    deduped.dedup();
    assert_eq!(stamps, deduped);
    assert_eq!(stamps.len(), 6);
}

#[tokio::test]
async fn load_failure_rearms_soon() {
    let now = 1_700_000_000;
    let f = fixture(ScheduleConfig::default(), now);
    f.store.set_fail_schedule_load(true);

    assert!(f.service.activate().await.is_err());
    assert_eq!(f.alarm.last(), Some(now + 60));
}

#[tokio::test]
async fn corrupt_state_is_rebuilt() {
    let now = 1_700_000_000;
    let f = fixture(ScheduleConfig::default(), now);
    f.store.put_schedule(ScheduleState {
        seed: 0,
        next_timestamp: now - 100,
        gap_minutes: 45,
    });

    let report = f.service.activate().await.unwrap();
    assert!(report.recorded.is_empty());
    assert_eq!(f.store.schedule(), Some(rng::reconstruct(now, 45)));
}

#[tokio::test]
async fn gap_change_applies_to_future_pings_only() {
    let config = ScheduleConfig {
        gap_minutes: 10,
        ..ScheduleConfig::default()
    };
    let f = fixture(config, EPOCH - 10);
    f.store.put_schedule(epoch_state());

    f.service.activate().await.unwrap();
    let persisted = f.store.schedule().unwrap();
    assert_eq!(persisted.next_timestamp, EPOCH);
    assert_eq!(persisted.seed, INITIAL_SEED);
    assert_eq!(persisted.gap_minutes, 10);

    f.clock.set(EPOCH);
    f.service.activate().await.unwrap();
    let (_, expected_next) = rng::next_timestamp(EPOCH, INITIAL_SEED, 10);
    assert_eq!(f.store.schedule().unwrap().next_timestamp, expected_next);
    assert_eq!(f.store.samples()[0].period_minutes, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_activations_are_serialized() {
    let f = fixture(ScheduleConfig::default(), SIXTH_PING + 30);
    f.store.put_schedule(epoch_state());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = f.service.clone();
            tokio::spawn(async move { service.activate().await })
        })
        .collect();
    let mut total = 0;
    for handle in handles {
        total += handle.await.unwrap().unwrap().recorded.len();
    }

    assert_eq!(total, 6);
    assert_eq!(f.store.samples().len(), 6);
    assert_eq!(f.notifier.count(NotificationKind::NewSample), 1);
}

#[tokio::test]
async fn upcoming_previews_without_mutating() {
    let f = fixture(ScheduleConfig::default(), EPOCH);
    f.store.put_schedule(epoch_state());

    let pings = f.service.upcoming(3).await.unwrap();
    assert_eq!(pings, vec![EPOCH, 1_184_098_754, 1_184_102_685]);
    assert_eq!(f.store.schedule(), Some(epoch_state()));
}

#[tokio::test]
async fn sqlite_backed_activation_persists_across_services() {
    let harness = TestHarness::builder()
        .with_now(SIXTH_PING + 30)
        .build()
        .await
        .unwrap();
    harness.store.save_schedule(&epoch_state()).await.unwrap();

    let service = SchedulerService::new(
        harness.config.schedule.clone(),
        harness.store.clone(),
        harness.store.clone(),
        harness.notifier.clone(),
        harness.alarm.clone(),
        harness.clock.clone(),
    );
    let report = service.activate().await.unwrap();
    assert_eq!(report.recorded.len(), 6);

    let recent = harness.store.recent_samples(10).await.unwrap();
    assert_eq!(recent.len(), 6);
    assert_eq!(recent[0].timestamp, SIXTH_PING);
    assert_eq!(
        harness.store.load_schedule().await.unwrap().unwrap().next_timestamp,
        SEVENTH_PING
    );
}
