// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits for schedule state, samples and goals.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::TagTimeError;
use crate::types::{
    Goal, GoalId, NewGoal, NewPoint, Pairing, Point, PointId, Sample, SampleId, ScheduleState,
    TagSet,
};

/// Persists the singleton scheduler state.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Loads the persisted state, if any.
    async fn load_schedule(&self) -> Result<Option<ScheduleState>, TagTimeError>;

    /// Replaces the persisted state as a single unit.
    async fn save_schedule(&self, state: &ScheduleState) -> Result<(), TagTimeError>;
}

/// Persists samples and their tags.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Records a sample. Recording a timestamp that already exists returns the
    /// existing sample's id and leaves it untouched.
    async fn create_sample(
        &self,
        timestamp: i64,
        tags: &TagSet,
        period_minutes: u32,
    ) -> Result<SampleId, TagTimeError>;

    async fn get_sample(&self, id: SampleId) -> Result<Option<Sample>, TagTimeError>;

    /// Returns `NotFound` if the sample does not exist.
    async fn tags_for_sample(&self, id: SampleId) -> Result<TagSet, TagTimeError>;

    /// Replaces the sample's tag set. Returns `NotFound` if the sample does not exist.
    async fn update_tags(&self, id: SampleId, tags: &TagSet) -> Result<(), TagTimeError>;

    /// Number of samples carrying each tag.
    async fn tag_usage_counts(&self) -> Result<HashMap<String, u64>, TagTimeError>;

    /// Most recent samples first.
    async fn recent_samples(&self, limit: usize) -> Result<Vec<Sample>, TagTimeError>;
}

/// Persists goal registrations, points, and sample/point pairings.
#[async_trait]
pub trait GoalStore: Send + Sync {
    /// Links a goal, or re-links an existing `(user, slug)`.
    ///
    /// Re-linking replaces the credential (marking it valid) and the tag set,
    /// and moves `active_since` to `max(previous, now)`.
    async fn link_goal(&self, goal: &NewGoal, now: i64) -> Result<GoalId, TagTimeError>;

    async fn list_goals(&self) -> Result<Vec<Goal>, TagTimeError>;

    /// Removes a goal together with its points and pairings. Returns false if
    /// it did not exist.
    async fn remove_goal(&self, id: GoalId) -> Result<bool, TagTimeError>;

    /// Goals whose tag set shares at least one tag with `tags`.
    async fn goals_matching_tags(&self, tags: &TagSet) -> Result<Vec<GoalId>, TagTimeError>;

    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>, TagTimeError>;

    /// The goal's `active_since` watermark.
    async fn watermark(&self, id: GoalId) -> Result<Option<i64>, TagTimeError>;

    /// Marks the goal's credential as rejected by the remote service.
    async fn invalidate_credential(&self, id: GoalId) -> Result<(), TagTimeError>;

    async fn pairings_for_sample(&self, sample_id: SampleId)
    -> Result<Vec<Pairing>, TagTimeError>;

    async fn get_point(&self, id: PointId) -> Result<Option<Point>, TagTimeError>;

    /// Inserts an unconfirmed point and its pairing with `sample_id` as one
    /// unit. Fails if the sample is already paired with a point for the same goal.
    async fn create_pairing(
        &self,
        sample_id: SampleId,
        point: &NewPoint,
    ) -> Result<PointId, TagTimeError>;

    /// Records the remote request id of a point the remote service accepted.
    async fn confirm_point(
        &self,
        id: PointId,
        remote_request_id: &str,
    ) -> Result<(), TagTimeError>;

    /// Deletes the pairing and its point as one unit.
    async fn delete_pairing(
        &self,
        sample_id: SampleId,
        point_id: PointId,
    ) -> Result<(), TagTimeError>;
}
