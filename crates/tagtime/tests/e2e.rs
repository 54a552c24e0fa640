// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end flows: scheduler activation, user tagging, goal sync.
//!
//! Each test builds an isolated TestHarness over a temporary SQLite database
//! with the fake remote service, manual clock and recording notifier.

use tagtime_core::{
    GoalStore, Notification, NotificationKind, SampleStore, ScheduleState, ScheduleStore, TagSet,
};
use tagtime_schedule::SchedulerService;
use tagtime_schedule::rng::{self, EPOCH, INITIAL_SEED};
use tagtime_sync::{SyncQueue, build_queue};
use tagtime_test_utils::TestHarness;
use tokio_util::sync::CancellationToken;

fn epoch_state() -> ScheduleState {
    ScheduleState {
        seed: INITIAL_SEED,
        next_timestamp: EPOCH,
        gap_minutes: 45,
    }
}

fn wire(harness: &TestHarness) -> (SchedulerService, SyncQueue) {
    let scheduler = SchedulerService::new(
        harness.config.schedule.clone(),
        harness.store.clone(),
        harness.store.clone(),
        harness.notifier.clone(),
        harness.alarm.clone(),
        harness.clock.clone(),
    );
    let queue = build_queue(
        &harness.config.sync,
        harness.store.clone(),
        harness.store.clone(),
        harness.notifier.clone(),
        harness.remote.connector(),
        CancellationToken::new(),
    );
    (scheduler, queue)
}

// ---- Ping, tag, sync ----

#[tokio::test]
async fn prompted_ping_tagged_by_user_reaches_goal() {
    let due = rng::step(&epoch_state());
    let first_ping = due.next_timestamp;
    let harness = TestHarness::builder()
        .with_now(first_ping)
        .build()
        .await
        .unwrap();
    harness.link_goal("alice", "work", "work", 0).await.unwrap();
    harness.store.save_schedule(&due).await.unwrap();
    let (scheduler, queue) = wire(&harness);

    let report = scheduler.activate().await.unwrap();
    assert_eq!(report.prompted, 1);
    let sample_id = match harness.notifier.all().as_slice() {
        [Notification::NewSample { sample_id, .. }] => *sample_id,
        other => panic!("expected one new-sample notification, got {other:?}"),
    };

    queue
        .edit_tags(sample_id, TagSet::parse("work email"))
        .await
        .unwrap();
    queue.wait_idle().await;

    let points = harness.remote.points("alice/work");
    assert_eq!(points.len(), 1);
    let point = points.values().next().unwrap();
    assert_eq!(point.timestamp, first_ping);
    assert_eq!(point.value, 0.75);
    assert_eq!(point.comment, "TagTime ping: email work");
}

#[tokio::test]
async fn missed_pings_are_recorded_off_and_never_synced() {
    let harness = TestHarness::builder()
        .with_now(1_184_105_815 + 30)
        .build()
        .await
        .unwrap();
    harness.link_goal("alice", "off", "OFF", 0).await.unwrap();
    harness.store.save_schedule(&epoch_state()).await.unwrap();
    let (scheduler, queue) = wire(&harness);

    let report = scheduler.activate().await.unwrap();
    assert_eq!(report.retro, 5);
    assert_eq!(harness.notifier.count(NotificationKind::NewSample), 1);

    queue.wait_idle().await;
    assert!(harness.remote.calls().is_empty());
    let samples = harness.store.recent_samples(10).await.unwrap();
    assert_eq!(samples.len(), 6);
    assert_eq!(
        samples.iter().filter(|s| s.tags == TagSet::off()).count(),
        5
    );
}

#[tokio::test]
async fn retag_moves_point_between_goals() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.link_goal("alice", "work", "work", 0).await.unwrap();
    harness.link_goal("alice", "home", "home chores", 0).await.unwrap();
    let sample = harness.sample(1_000, "").await.unwrap();
    let (_, queue) = wire(&harness);

    queue.edit_tags(sample, TagSet::parse("work")).await.unwrap();
    queue.wait_idle().await;
    queue.edit_tags(sample, TagSet::parse("chores")).await.unwrap();
    queue.wait_idle().await;

    assert!(harness.remote.points("alice/work").is_empty());
    assert_eq!(harness.remote.points("alice/home").len(), 1);
    assert_eq!(
        harness.store.pairings_for_sample(sample).await.unwrap().len(),
        1
    );
}

// ---- Goal lifecycle ----

#[tokio::test]
async fn relinked_goal_only_claims_new_samples() {
    let harness = TestHarness::builder().build().await.unwrap();
    let goal = harness.link_goal("alice", "work", "work", 0).await.unwrap();
    harness.link_goal("alice", "work", "work", 5_000).await.unwrap();
    assert_eq!(harness.store.watermark(goal).await.unwrap(), Some(5_000));

    // Moving the watermark backwards is ignored.
    harness.link_goal("alice", "work", "work", 10).await.unwrap();
    assert_eq!(harness.store.watermark(goal).await.unwrap(), Some(5_000));

    let before = harness.sample(4_000, "").await.unwrap();
    let after = harness.sample(6_000, "").await.unwrap();
    let (_, queue) = wire(&harness);
    queue.edit_tags(before, TagSet::parse("work")).await.unwrap();
    queue.edit_tags(after, TagSet::parse("work")).await.unwrap();
    queue.wait_idle().await;

    assert!(harness.store.pairings_for_sample(before).await.unwrap().is_empty());
    assert_eq!(harness.store.pairings_for_sample(after).await.unwrap().len(), 1);
}

#[tokio::test]
async fn removed_goal_drops_local_points() {
    let harness = TestHarness::builder().build().await.unwrap();
    let goal = harness.link_goal("alice", "work", "work", 0).await.unwrap();
    let sample = harness.sample(1_000, "").await.unwrap();
    let (_, queue) = wire(&harness);
    queue.edit_tags(sample, TagSet::parse("work")).await.unwrap();
    queue.wait_idle().await;

    assert!(harness.store.remove_goal(goal).await.unwrap());
    assert!(harness.store.pairings_for_sample(sample).await.unwrap().is_empty());
    assert!(harness.store.list_goals().await.unwrap().is_empty());
}
