// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation of a sample's goal points after a tag edit.
//!
//! For one sample the engine keeps confirmed points whose goal still
//! matches, creates points for newly matching goals and deletes points whose
//! goal no longer matches. A point row and its pairing are written before the
//! remote create, so a crash or failure leaves a pending point that the next
//! attempt re-submits instead of duplicating.

use std::collections::HashMap;
use std::sync::Arc;

use tagtime_core::{
    Goal, GoalId, GoalStore, NewPoint, Notification, NotificationSink, Pairing, PointId,
    RemoteErrorKind, RemoteFailure, Sample, SampleId, SampleStore, TagSet, TagTimeError,
};
use tracing::{debug, info, warn};

use crate::bridge::{PointRequest, SessionBridge};
use crate::outcome::{Operation, OperationOutcome, classify};
use crate::retry::RetryPolicy;

/// One queued reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub sample_id: SampleId,
    pub old_tags: TagSet,
    pub new_tags: TagSet,
    /// Attempts already made for this edit.
    pub retry_count: u32,
}

impl WorkItem {
    pub fn new(sample_id: SampleId, old_tags: TagSet, new_tags: TagSet) -> Self {
        Self {
            sample_id,
            old_tags,
            new_tags,
            retry_count: 0,
        }
    }
}

/// What one reconciliation attempt did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Points confirmed by the remote service during this attempt.
    pub created: usize,
    /// Confirmed points left in place.
    pub kept: usize,
    /// Pairings removed.
    pub deleted: usize,
    /// Goals skipped because their credential was rejected earlier.
    pub skipped: usize,
    /// Failures worth another attempt.
    pub retryable: Vec<RemoteFailure>,
    /// Failures that need the user.
    pub fatal: Vec<RemoteFailure>,
}

impl ReconcileReport {
    pub fn needs_retry(&self) -> bool {
        !self.retryable.is_empty()
    }
}

/// Point value for a sample: its period in hours.
pub fn point_value(sample: &Sample) -> f64 {
    f64::from(sample.period_minutes) / 60.0
}

pub fn point_comment(tags: &TagSet) -> String {
    format!("TagTime ping: {tags}")
}

pub struct SyncEngine {
    samples: Arc<dyn SampleStore>,
    goals: Arc<dyn GoalStore>,
    notifier: Arc<dyn NotificationSink>,
    bridge: SessionBridge,
    policy: RetryPolicy,
}

impl SyncEngine {
    pub fn new(
        samples: Arc<dyn SampleStore>,
        goals: Arc<dyn GoalStore>,
        notifier: Arc<dyn NotificationSink>,
        bridge: SessionBridge,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            samples,
            goals,
            notifier,
            bridge,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub(crate) fn samples(&self) -> &Arc<dyn SampleStore> {
        &self.samples
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn NotificationSink> {
        &self.notifier
    }

    /// Brings the sample's points in line with `item.new_tags`.
    ///
    /// Remote failures are collected in the report and never abort the
    /// remaining goals. Storage failures abort the attempt and are returned.
    pub async fn reconcile(&self, item: &WorkItem) -> Result<ReconcileReport, TagTimeError> {
        let sample = self
            .samples
            .get_sample(item.sample_id)
            .await?
            .ok_or_else(|| TagTimeError::NotFound {
                entity: "sample",
                id: item.sample_id.to_string(),
            })?;
        debug!(
            sample_id = %sample.id,
            old_tags = %item.old_tags,
            new_tags = %item.new_tags,
            retry_count = item.retry_count,
            "reconciling sample"
        );

        let mut existing: HashMap<GoalId, Pairing> = self
            .goals
            .pairings_for_sample(sample.id)
            .await?
            .into_iter()
            .map(|p| (p.goal_id, p))
            .collect();
        let mut report = ReconcileReport::default();

        for goal_id in self.goals.goals_matching_tags(&item.new_tags).await? {
            let Some(goal) = self.goals.get_goal(goal_id).await? else {
                continue;
            };
            let pairing = existing.remove(&goal_id);
            if !self.credential_usable(&goal, &mut report) {
                continue;
            }
            match pairing {
                Some(pairing) => {
                    self.revisit(&goal, &sample, item, pairing, &mut report)
                        .await?;
                }
                None => {
                    if predates_watermark(&goal, &sample) {
                        continue;
                    }
                    let point_id = self
                        .goals
                        .create_pairing(sample.id, &new_point(&goal, &sample, &item.new_tags))
                        .await?;
                    debug!(sample_id = %sample.id, goal = %goal.label(), point_id = %point_id, "pending point recorded");
                    self.push_create(&goal, &sample, &item.new_tags, point_id, &mut report)
                        .await?;
                }
            }
        }

        for pairing in existing.into_values() {
            let Some(goal) = self.goals.get_goal(pairing.goal_id).await? else {
                continue;
            };
            if !self.credential_usable(&goal, &mut report) {
                continue;
            }
            self.remove(&goal, item, pairing, &mut report).await?;
        }

        info!(
            sample_id = %sample.id,
            created = report.created,
            kept = report.kept,
            deleted = report.deleted,
            retryable = report.retryable.len(),
            fatal = report.fatal.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    /// Goals with a rejected credential are frozen until re-linked.
    fn credential_usable(&self, goal: &Goal, report: &mut ReconcileReport) -> bool {
        if !goal.credential_valid {
            debug!(goal = %goal.label(), "credential invalid, goal skipped");
            report.skipped += 1;
            return false;
        }
        true
    }

    /// A goal that still matches and already has a pairing with the sample.
    async fn revisit(
        &self,
        goal: &Goal,
        sample: &Sample,
        item: &WorkItem,
        pairing: Pairing,
        report: &mut ReconcileReport,
    ) -> Result<(), TagTimeError> {
        match self.goals.get_point(pairing.point_id).await? {
            Some(point) if point.is_confirmed() => {
                report.kept += 1;
                Ok(())
            }
            Some(point) => {
                debug!(goal = %goal.label(), point_id = %point.id, "re-submitting pending point");
                self.push_create(goal, sample, &item.new_tags, point.id, report)
                    .await
            }
            None => {
                self.goals
                    .delete_pairing(sample.id, pairing.point_id)
                    .await?;
                let point_id = self
                    .goals
                    .create_pairing(sample.id, &new_point(goal, sample, &item.new_tags))
                    .await?;
                self.push_create(goal, sample, &item.new_tags, point_id, report)
                    .await
            }
        }
    }

    async fn push_create(
        &self,
        goal: &Goal,
        sample: &Sample,
        tags: &TagSet,
        point_id: PointId,
        report: &mut ReconcileReport,
    ) -> Result<(), TagTimeError> {
        let request = PointRequest::Create {
            value: point_value(sample),
            timestamp: sample.timestamp,
            comment: point_comment(tags),
        };
        let result = self.bridge.submit(goal, &request).await;
        match classify(Operation::Create, result, None, false) {
            OperationOutcome::Success(remote_id) => {
                self.goals.confirm_point(point_id, &remote_id).await?;
                info!(
                    sample_id = %sample.id,
                    goal = %goal.label(),
                    remote_request_id = %remote_id,
                    "point created"
                );
                report.created += 1;
            }
            OperationOutcome::Retryable(failure) => {
                warn!(goal = %goal.label(), error = %failure, "point create failed, will retry");
                report.retryable.push(failure);
            }
            OperationOutcome::Fatal(failure) => self.fatal(goal, failure, report).await?,
        }
        Ok(())
    }

    /// A pairing whose goal no longer matches.
    async fn remove(
        &self,
        goal: &Goal,
        item: &WorkItem,
        pairing: Pairing,
        report: &mut ReconcileReport,
    ) -> Result<(), TagTimeError> {
        let remote_id = self
            .goals
            .get_point(pairing.point_id)
            .await?
            .and_then(|p| p.remote_request_id);
        let Some(remote_id) = remote_id else {
            // Never reached the remote side.
            self.goals
                .delete_pairing(pairing.sample_id, pairing.point_id)
                .await?;
            debug!(goal = %goal.label(), point_id = %pairing.point_id, "pending point discarded");
            report.deleted += 1;
            return Ok(());
        };

        let request = PointRequest::Delete {
            remote_request_id: remote_id.clone(),
        };
        let result = self.bridge.submit(goal, &request).await;
        let resolves = self.policy.not_found_resolves(item.retry_count);
        match classify(Operation::Delete, result, Some(&remote_id), resolves) {
            OperationOutcome::Success(_) => {
                self.goals
                    .delete_pairing(pairing.sample_id, pairing.point_id)
                    .await?;
                info!(
                    sample_id = %pairing.sample_id,
                    goal = %goal.label(),
                    remote_request_id = %remote_id,
                    "point deleted"
                );
                report.deleted += 1;
            }
            OperationOutcome::Retryable(failure) => {
                warn!(goal = %goal.label(), error = %failure, "point delete failed, will retry");
                report.retryable.push(failure);
            }
            OperationOutcome::Fatal(failure) => self.fatal(goal, failure, report).await?,
        }
        Ok(())
    }

    async fn fatal(
        &self,
        goal: &Goal,
        failure: RemoteFailure,
        report: &mut ReconcileReport,
    ) -> Result<(), TagTimeError> {
        match failure.kind {
            RemoteErrorKind::Unauthorized => {
                warn!(goal = %goal.label(), error = %failure, "credential rejected");
                self.goals.invalidate_credential(goal.id).await?;
                self.notifier.notify(Notification::AuthError {
                    goal_id: goal.id,
                    goal: goal.label(),
                    message: failure.message.clone(),
                });
            }
            _ => {
                warn!(goal = %goal.label(), error = %failure, "protocol version rejected");
                self.notifier.notify(Notification::VersionError {
                    goal_id: goal.id,
                    goal: goal.label(),
                    message: failure.message.clone(),
                });
            }
        }
        report.fatal.push(failure);
        Ok(())
    }
}

/// A goal only claims samples taken at or after its watermark. Pairings it
/// already holds are maintained regardless.
fn predates_watermark(goal: &Goal, sample: &Sample) -> bool {
    if goal.active_since > sample.timestamp {
        debug!(
            goal = %goal.label(),
            active_since = goal.active_since,
            sample_timestamp = sample.timestamp,
            "sample predates goal watermark"
        );
        return true;
    }
    false
}

fn new_point(goal: &Goal, sample: &Sample, tags: &TagSet) -> NewPoint {
    NewPoint {
        goal_id: goal.id,
        value: point_value(sample),
        timestamp: sample.timestamp,
        comment: point_comment(tags),
    }
}
