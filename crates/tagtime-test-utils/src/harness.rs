// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness over a temporary SQLite database.
//!
//! `TestHarness` wires a real [`SqliteStore`] with the fake clock, alarm,
//! notifier and remote service, so tests can drive the scheduler and the sync
//! engine against the same persistence the binary uses.

use std::sync::Arc;

use tagtime_config::model::{StorageConfig, TagTimeConfig};
use tagtime_core::{GoalId, GoalStore, NewGoal, SampleId, SampleStore, TagSet, TagTimeError};
use tagtime_storage::SqliteStore;

use crate::clock::{ManualClock, RecordingAlarm};
use crate::notifier::RecordingNotifier;
use crate::remote::FakeRemote;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    config: TagTimeConfig,
    now: i64,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: TagTimeConfig::default(),
            now: 1_700_000_000,
        }
    }

    /// Start with a custom configuration. The storage section is replaced.
    pub fn with_config(mut self, config: TagTimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial reading of the manual clock.
    pub fn with_now(mut self, now: i64) -> Self {
        self.now = now;
        self
    }

    pub async fn build(self) -> Result<TestHarness, TagTimeError> {
        let temp_dir = tempfile::TempDir::new().map_err(TagTimeError::storage)?;
        let db_path = temp_dir.path().join("tagtime.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let store = SqliteStore::new(config.storage.clone());
        store.initialize().await?;

        Ok(TestHarness {
            config,
            store: Arc::new(store),
            clock: Arc::new(ManualClock::new(self.now)),
            alarm: Arc::new(RecordingAlarm::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            remote: FakeRemote::new(),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete set of collaborators for one test.
pub struct TestHarness {
    pub config: TagTimeConfig,
    pub store: Arc<SqliteStore>,
    pub clock: Arc<ManualClock>,
    pub alarm: Arc<RecordingAlarm>,
    pub notifier: Arc<RecordingNotifier>,
    pub remote: Arc<FakeRemote>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Links `user/slug` for `tags` with the watermark at `active_since`.
    pub async fn link_goal(
        &self,
        user: &str,
        slug: &str,
        tags: &str,
        active_since: i64,
    ) -> Result<GoalId, TagTimeError> {
        let goal = NewGoal {
            remote_user: user.to_string(),
            remote_slug: slug.to_string(),
            credential: format!("token-{user}"),
            tags: TagSet::parse(tags),
        };
        self.store.link_goal(&goal, active_since).await
    }

    /// Records a sample at `timestamp` with the given tag string.
    pub async fn sample(&self, timestamp: i64, tags: &str) -> Result<SampleId, TagTimeError> {
        self.store
            .create_sample(timestamp, &TagSet::parse(tags), 45)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_builds_with_working_store() {
        let harness = TestHarness::builder().with_now(42).build().await.unwrap();
        let goal = harness.link_goal("alice", "work", "work", 0).await.unwrap();
        let sample = harness.sample(100, "work").await.unwrap();
        assert_eq!(
            harness.store.goals_matching_tags(&TagSet::parse("work")).await.unwrap(),
            vec![goal]
        );
        assert_eq!(
            harness.store.tags_for_sample(sample).await.unwrap(),
            TagSet::parse("work")
        );
        assert_eq!(tagtime_core::Clock::now(harness.clock.as_ref()), 42);
    }
}
