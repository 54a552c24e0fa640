// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the schedule, sample and goal store traits.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use tagtime_config::model::StorageConfig;
use tagtime_core::{
    Goal, GoalId, GoalStore, HealthStatus, NewGoal, NewPoint, Pairing, Point, PointId, Sample,
    SampleId, SampleStore, ScheduleState, ScheduleStore, TagSet, TagTimeError,
};

use crate::database::{self, Database, map_tr_err};
use crate::queries::{goals, points, samples, schedule};

/// SQLite-backed store.
///
/// Wraps a [`Database`] opened lazily by [`SqliteStore::initialize`] and
/// delegates every operation to the typed query modules.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// The database is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Opens a store over an already open database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Opens and migrates a private in-memory store.
    pub async fn open_in_memory() -> Result<Self, TagTimeError> {
        let config = StorageConfig {
            database_path: database::IN_MEMORY.to_string(),
            wal_mode: false,
        };
        let store = Self::new(config);
        store.initialize().await?;
        Ok(store)
    }

    fn db(&self) -> Result<&Database, TagTimeError> {
        self.db.get().ok_or_else(|| TagTimeError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Opens the database and runs migrations.
    pub async fn initialize(&self) -> Result<(), TagTimeError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| TagTimeError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<HealthStatus, TagTimeError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.connection()
            .call(|conn| -> rusqlite::Result<()> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    /// Checkpoints the WAL so the database file is self-contained.
    pub async fn close(&self) -> Result<(), TagTimeError> {
        if let Some(db) = self.db.get() {
            database::checkpoint(db.connection()).await?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn load_schedule(&self) -> Result<Option<ScheduleState>, TagTimeError> {
        schedule::load(self.db()?).await
    }

    async fn save_schedule(&self, state: &ScheduleState) -> Result<(), TagTimeError> {
        schedule::save(self.db()?, state).await
    }
}

#[async_trait]
impl SampleStore for SqliteStore {
    async fn create_sample(
        &self,
        timestamp: i64,
        tags: &TagSet,
        period_minutes: u32,
    ) -> Result<SampleId, TagTimeError> {
        samples::create_sample(self.db()?, timestamp, tags, period_minutes).await
    }

    async fn get_sample(&self, id: SampleId) -> Result<Option<Sample>, TagTimeError> {
        samples::get_sample(self.db()?, id).await
    }

    async fn tags_for_sample(&self, id: SampleId) -> Result<TagSet, TagTimeError> {
        samples::tags_for_sample(self.db()?, id).await
    }

    async fn update_tags(&self, id: SampleId, tags: &TagSet) -> Result<(), TagTimeError> {
        samples::update_tags(self.db()?, id, tags).await
    }

    async fn tag_usage_counts(&self) -> Result<HashMap<String, u64>, TagTimeError> {
        samples::tag_usage_counts(self.db()?).await
    }

    async fn recent_samples(&self, limit: usize) -> Result<Vec<Sample>, TagTimeError> {
        samples::recent_samples(self.db()?, limit).await
    }
}

#[async_trait]
impl GoalStore for SqliteStore {
    async fn link_goal(&self, goal: &NewGoal, now: i64) -> Result<GoalId, TagTimeError> {
        goals::link_goal(self.db()?, goal, now).await
    }

    async fn list_goals(&self) -> Result<Vec<Goal>, TagTimeError> {
        goals::list_goals(self.db()?).await
    }

    async fn remove_goal(&self, id: GoalId) -> Result<bool, TagTimeError> {
        goals::remove_goal(self.db()?, id).await
    }

    async fn goals_matching_tags(&self, tags: &TagSet) -> Result<Vec<GoalId>, TagTimeError> {
        goals::goals_matching_tags(self.db()?, tags).await
    }

    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>, TagTimeError> {
        goals::get_goal(self.db()?, id).await
    }

    async fn watermark(&self, id: GoalId) -> Result<Option<i64>, TagTimeError> {
        goals::watermark(self.db()?, id).await
    }

    async fn invalidate_credential(&self, id: GoalId) -> Result<(), TagTimeError> {
        goals::invalidate_credential(self.db()?, id).await
    }

    async fn pairings_for_sample(
        &self,
        sample_id: SampleId,
    ) -> Result<Vec<Pairing>, TagTimeError> {
        points::pairings_for_sample(self.db()?, sample_id).await
    }

    async fn get_point(&self, id: PointId) -> Result<Option<Point>, TagTimeError> {
        points::get_point(self.db()?, id).await
    }

    async fn create_pairing(
        &self,
        sample_id: SampleId,
        point: &NewPoint,
    ) -> Result<PointId, TagTimeError> {
        points::create_pairing(self.db()?, sample_id, point).await
    }

    async fn confirm_point(
        &self,
        id: PointId,
        remote_request_id: &str,
    ) -> Result<(), TagTimeError> {
        points::confirm_point(self.db()?, id, remote_request_id).await
    }

    async fn delete_pairing(
        &self,
        sample_id: SampleId,
        point_id: PointId,
    ) -> Result<(), TagTimeError> {
        points::delete_pairing(self.db()?, sample_id, point_id).await
    }
}
