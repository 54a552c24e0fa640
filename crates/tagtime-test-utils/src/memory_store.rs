// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory implementation of every store trait, with failure injection.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tagtime_core::{
    Goal, GoalId, GoalStore, NewGoal, NewPoint, Pairing, Point, PointId, Sample, SampleId,
    SampleStore, ScheduleState, ScheduleStore, TagSet, TagTimeError,
};

#[derive(Default)]
struct Inner {
    schedule: Option<ScheduleState>,
    samples: BTreeMap<i64, Sample>,
    goals: BTreeMap<i64, Goal>,
    points: BTreeMap<i64, Point>,
    pairings: Vec<Pairing>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Thread-safe in-memory store.
///
/// Failure switches make individual operations return a storage error so
/// abort paths can be exercised.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_schedule_load: AtomicBool,
    fail_schedule_save: AtomicBool,
    fail_create_pairing: AtomicBool,
    sample_creates_left: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            fail_schedule_load: AtomicBool::new(false),
            fail_schedule_save: AtomicBool::new(false),
            fail_create_pairing: AtomicBool::new(false),
            sample_creates_left: AtomicUsize::new(usize::MAX),
        }
    }
}

fn injected(op: &str) -> TagTimeError {
    TagTimeError::Storage {
        source: format!("injected failure: {op}").into(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_schedule_load(&self, fail: bool) {
        self.fail_schedule_load.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_schedule_save(&self, fail: bool) {
        self.fail_schedule_save.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_create_pairing(&self, fail: bool) {
        self.fail_create_pairing.store(fail, Ordering::SeqCst);
    }

    /// Lets `n` more samples be created, then fails every creation.
    pub fn fail_sample_creates_after(&self, n: usize) {
        self.sample_creates_left.store(n, Ordering::SeqCst);
    }

    /// Every sample, oldest first.
    pub fn samples(&self) -> Vec<Sample> {
        let inner = self.inner.lock().unwrap();
        let mut samples: Vec<Sample> = inner.samples.values().cloned().collect();
        samples.sort_by_key(|s| s.timestamp);
        samples
    }

    pub fn points(&self) -> Vec<Point> {
        self.inner.lock().unwrap().points.values().cloned().collect()
    }

    pub fn pairings(&self) -> Vec<Pairing> {
        self.inner.lock().unwrap().pairings.clone()
    }

    pub fn schedule(&self) -> Option<ScheduleState> {
        self.inner.lock().unwrap().schedule
    }

    /// Overwrites the persisted schedule without going through the trait.
    pub fn put_schedule(&self, state: ScheduleState) {
        self.inner.lock().unwrap().schedule = Some(state);
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn load_schedule(&self) -> Result<Option<ScheduleState>, TagTimeError> {
        if self.fail_schedule_load.load(Ordering::SeqCst) {
            return Err(injected("load_schedule"));
        }
        Ok(self.inner.lock().unwrap().schedule)
    }

    async fn save_schedule(&self, state: &ScheduleState) -> Result<(), TagTimeError> {
        if self.fail_schedule_save.load(Ordering::SeqCst) {
            return Err(injected("save_schedule"));
        }
        self.inner.lock().unwrap().schedule = Some(*state);
        Ok(())
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn create_sample(
        &self,
        timestamp: i64,
        tags: &TagSet,
        period_minutes: u32,
    ) -> Result<SampleId, TagTimeError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.samples.values().find(|s| s.timestamp == timestamp) {
            return Ok(existing.id);
        }
        let allowed = self
            .sample_creates_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if allowed.is_err() {
            return Err(injected("create_sample"));
        }
        let id = SampleId(inner.next_id());
        inner.samples.insert(
            id.0,
            Sample {
                id,
                timestamp,
                period_minutes,
                tags: tags.clone(),
            },
        );
        Ok(id)
    }

    async fn get_sample(&self, id: SampleId) -> Result<Option<Sample>, TagTimeError> {
        Ok(self.inner.lock().unwrap().samples.get(&id.0).cloned())
    }

    async fn tags_for_sample(&self, id: SampleId) -> Result<TagSet, TagTimeError> {
        self.inner
            .lock()
            .unwrap()
            .samples
            .get(&id.0)
            .map(|s| s.tags.clone())
            .ok_or_else(|| TagTimeError::NotFound {
                entity: "sample",
                id: id.to_string(),
            })
    }

    async fn update_tags(&self, id: SampleId, tags: &TagSet) -> Result<(), TagTimeError> {
        let mut inner = self.inner.lock().unwrap();
        let sample = inner
            .samples
            .get_mut(&id.0)
            .ok_or_else(|| TagTimeError::NotFound {
                entity: "sample",
                id: id.to_string(),
            })?;
        sample.tags = tags.clone();
        Ok(())
    }

    async fn tag_usage_counts(&self) -> Result<HashMap<String, u64>, TagTimeError> {
        let inner = self.inner.lock().unwrap();
        let mut counts = HashMap::new();
        for sample in inner.samples.values() {
            for tag in sample.tags.iter() {
                *counts.entry(tag.to_string()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn recent_samples(&self, limit: usize) -> Result<Vec<Sample>, TagTimeError> {
        let mut samples = self.samples();
        samples.reverse();
        samples.truncate(limit);
        Ok(samples)
    }
}

#[async_trait]
impl GoalStore for MemoryStore {
    async fn link_goal(&self, goal: &NewGoal, now: i64) -> Result<GoalId, TagTimeError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .goals
            .values_mut()
            .find(|g| g.remote_user == goal.remote_user && g.remote_slug == goal.remote_slug)
        {
            existing.credential = goal.credential.clone();
            existing.credential_valid = true;
            existing.tags = goal.tags.clone();
            existing.active_since = existing.active_since.max(now);
            return Ok(existing.id);
        }
        let id = GoalId(inner.next_id());
        inner.goals.insert(
            id.0,
            Goal {
                id,
                remote_user: goal.remote_user.clone(),
                remote_slug: goal.remote_slug.clone(),
                credential: goal.credential.clone(),
                credential_valid: true,
                tags: goal.tags.clone(),
                active_since: now,
            },
        );
        Ok(id)
    }

    async fn list_goals(&self) -> Result<Vec<Goal>, TagTimeError> {
        Ok(self.inner.lock().unwrap().goals.values().cloned().collect())
    }

    async fn remove_goal(&self, id: GoalId) -> Result<bool, TagTimeError> {
        let mut inner = self.inner.lock().unwrap();
        let existed = inner.goals.remove(&id.0).is_some();
        inner.points.retain(|_, p| p.goal_id != id);
        inner.pairings.retain(|p| p.goal_id != id);
        Ok(existed)
    }

    async fn goals_matching_tags(&self, tags: &TagSet) -> Result<Vec<GoalId>, TagTimeError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .goals
            .values()
            .filter(|g| g.tags.intersects(tags))
            .map(|g| g.id)
            .collect())
    }

    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>, TagTimeError> {
        Ok(self.inner.lock().unwrap().goals.get(&id.0).cloned())
    }

    async fn watermark(&self, id: GoalId) -> Result<Option<i64>, TagTimeError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .goals
            .get(&id.0)
            .map(|g| g.active_since))
    }

    async fn invalidate_credential(&self, id: GoalId) -> Result<(), TagTimeError> {
        let mut inner = self.inner.lock().unwrap();
        let goal = inner
            .goals
            .get_mut(&id.0)
            .ok_or_else(|| TagTimeError::NotFound {
                entity: "goal",
                id: id.to_string(),
            })?;
        goal.credential_valid = false;
        Ok(())
    }

    async fn pairings_for_sample(
        &self,
        sample_id: SampleId,
    ) -> Result<Vec<Pairing>, TagTimeError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .pairings
            .iter()
            .filter(|p| p.sample_id == sample_id)
            .copied()
            .collect())
    }

    async fn get_point(&self, id: PointId) -> Result<Option<Point>, TagTimeError> {
        Ok(self.inner.lock().unwrap().points.get(&id.0).cloned())
    }

    async fn create_pairing(
        &self,
        sample_id: SampleId,
        point: &NewPoint,
    ) -> Result<PointId, TagTimeError> {
        if self.fail_create_pairing.load(Ordering::SeqCst) {
            return Err(injected("create_pairing"));
        }
        let mut inner = self.inner.lock().unwrap();
        if inner
            .pairings
            .iter()
            .any(|p| p.sample_id == sample_id && p.goal_id == point.goal_id)
        {
            return Err(TagTimeError::Storage {
                source: "UNIQUE constraint failed: point_pairings.sample_id, goal_id".into(),
            });
        }
        let id = PointId(inner.next_id());
        inner.points.insert(
            id.0,
            Point {
                id,
                remote_request_id: None,
                value: point.value,
                timestamp: point.timestamp,
                comment: point.comment.clone(),
                goal_id: point.goal_id,
            },
        );
        inner.pairings.push(Pairing {
            sample_id,
            goal_id: point.goal_id,
            point_id: id,
        });
        Ok(id)
    }

    async fn confirm_point(
        &self,
        id: PointId,
        remote_request_id: &str,
    ) -> Result<(), TagTimeError> {
        let mut inner = self.inner.lock().unwrap();
        let point = inner
            .points
            .get_mut(&id.0)
            .ok_or_else(|| TagTimeError::NotFound {
                entity: "point",
                id: id.to_string(),
            })?;
        point.remote_request_id = Some(remote_request_id.to_string());
        Ok(())
    }

    async fn delete_pairing(
        &self,
        sample_id: SampleId,
        point_id: PointId,
    ) -> Result<(), TagTimeError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .pairings
            .retain(|p| !(p.sample_id == sample_id && p.point_id == point_id));
        inner.points.remove(&point_id.0);
        Ok(())
    }
}
