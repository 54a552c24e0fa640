// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the scheduler, the stores and the sync engine.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Tag recorded on samples that were missed while the scheduler was not
/// running (device off, process down) or while prompting was paused.
pub const OFF_TAG: &str = "OFF";

/// Unique identifier for a sample (ping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleId(pub i64);

/// Unique identifier for a linked goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GoalId(pub i64);

/// Unique identifier for a locally tracked point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId(pub i64);

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered, deduplicated set of tags.
///
/// Tags are case-sensitive and never contain whitespace. Parsing a tag string
/// splits on any run of whitespace and drops empty fragments, so `"  a  b a"`
/// yields `{a, b}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a whitespace-separated tag string.
    pub fn parse(input: &str) -> Self {
        input.split_whitespace().collect()
    }

    /// The set holding only the [`OFF_TAG`] sentinel.
    pub fn off() -> Self {
        std::iter::once(OFF_TAG).collect()
    }

    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }
        self.0.insert(tag.to_string())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// True when the two sets share at least one tag.
    pub fn intersects(&self, other: &TagSet) -> bool {
        self.0.iter().any(|t| other.0.contains(t))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(tag)?;
            first = false;
        }
        Ok(())
    }
}

/// A timestamped sampling event and the tags the user assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    /// Unix seconds. Immutable once recorded.
    pub timestamp: i64,
    /// Mean gap in effect when the sample was recorded.
    pub period_minutes: u32,
    pub tags: TagSet,
}

/// Persisted scheduler state. `seed` and `next_timestamp` are only ever
/// advanced together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    pub seed: i64,
    pub next_timestamp: i64,
    pub gap_minutes: u32,
}

/// A goal registration on the remote service.
#[derive(Clone, PartialEq, Eq)]
pub struct Goal {
    pub id: GoalId,
    pub remote_user: String,
    pub remote_slug: String,
    pub credential: String,
    /// Cleared when the remote service rejects the credential; set again on re-link.
    pub credential_valid: bool,
    pub tags: TagSet,
    /// Samples timestamped before this watermark are never claimed by the goal.
    pub active_since: i64,
}

impl Goal {
    /// `user/slug`, as used in log lines and notifications.
    pub fn label(&self) -> String {
        format!("{}/{}", self.remote_user, self.remote_slug)
    }
}

impl fmt::Debug for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Goal")
            .field("id", &self.id)
            .field("remote_user", &self.remote_user)
            .field("remote_slug", &self.remote_slug)
            .field("credential", &"[REDACTED]")
            .field("credential_valid", &self.credential_valid)
            .field("tags", &self.tags)
            .field("active_since", &self.active_since)
            .finish()
    }
}

/// Input for linking (or re-linking) a goal.
#[derive(Clone)]
pub struct NewGoal {
    pub remote_user: String,
    pub remote_slug: String,
    pub credential: String,
    pub tags: TagSet,
}

impl fmt::Debug for NewGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewGoal")
            .field("remote_user", &self.remote_user)
            .field("remote_slug", &self.remote_slug)
            .field("credential", &"[REDACTED]")
            .field("tags", &self.tags)
            .finish()
    }
}

/// A data point derived from a sample and submitted to one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    /// Remote idempotency key. `None` until the remote create has been confirmed.
    pub remote_request_id: Option<String>,
    pub value: f64,
    pub timestamp: i64,
    pub comment: String,
    pub goal_id: GoalId,
}

impl Point {
    pub fn is_confirmed(&self) -> bool {
        self.remote_request_id.is_some()
    }
}

/// Point fields known before the remote service has accepted it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoint {
    pub goal_id: GoalId,
    pub value: f64,
    pub timestamp: i64,
    pub comment: String,
}

/// Link between a sample and one point it produced for one goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pairing {
    pub sample_id: SampleId,
    pub goal_id: GoalId,
    pub point_id: PointId,
}

/// Failure classes reported by the remote goal service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum RemoteErrorKind {
    /// Credential revoked or wrong. Needs the user to re-link the goal.
    Unauthorized,
    /// Client and server disagree on the protocol.
    ProtocolVersionMismatch,
    /// Target goal or point does not exist.
    NotFound,
    /// Timeouts and generic remote errors.
    Transient,
}

/// A failed remote call: its class and the server's (or transport's) message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteFailure {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteFailure {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Session lifecycle events delivered to a [`SessionListener`](crate::SessionListener).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Opened,
    ClosedOnError(RemoteFailure),
    Closed,
}

/// Correlates a submission with its completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionHandle(pub u64);

/// Completion of a create or delete submission: the remote request id on success.
pub type SubmissionResult = Result<String, RemoteFailure>;

/// Kinds of user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum NotificationKind {
    NewSample,
    ResubmitNeeded,
    AuthError,
    VersionError,
}

/// A user-facing notification. Delivery is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A sample was recorded inside the normal window and awaits tags.
    NewSample {
        sample_id: SampleId,
        timestamp: i64,
        /// Most used tags, offered as one-tap answers.
        suggested_tags: Vec<String>,
    },
    /// Syncing a sample gave up after the retry ceiling; the user must re-edit it.
    ResubmitNeeded { sample_id: SampleId, reason: String },
    /// The remote service rejected a goal's credential.
    AuthError {
        goal_id: GoalId,
        goal: String,
        message: String,
    },
    /// The remote service rejected the protocol version.
    VersionError {
        goal_id: GoalId,
        goal: String,
        message: String,
    },
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::NewSample { .. } => NotificationKind::NewSample,
            Self::ResubmitNeeded { .. } => NotificationKind::ResubmitNeeded,
            Self::AuthError { .. } => NotificationKind::AuthError,
            Self::VersionError { .. } => NotificationKind::VersionError,
        }
    }
}

/// Health status reported by store health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Operational but experiencing issues.
    Degraded(String),
    /// Not operational.
    Unhealthy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_set_parses_whitespace_and_dedupes() {
        let tags = TagSet::parse("  work\tcode  work \n email ");
        assert_eq!(tags.len(), 3);
        assert!(tags.contains("work"));
        assert!(tags.contains("code"));
        assert!(tags.contains("email"));
        assert_eq!(tags.to_string(), "code email work");
    }

    #[test]
    fn tag_set_is_case_sensitive() {
        let tags = TagSet::parse("Work work");
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn empty_string_parses_to_empty_set() {
        assert!(TagSet::parse("").is_empty());
        assert!(TagSet::parse("   ").is_empty());
        assert_eq!(TagSet::new().to_string(), "");
    }

    #[test]
    fn intersects_requires_a_shared_tag() {
        let a = TagSet::parse("work code");
        assert!(a.intersects(&TagSet::parse("code sleep")));
        assert!(!a.intersects(&TagSet::parse("home sleep")));
        assert!(!a.intersects(&TagSet::new()));
    }

    #[test]
    fn off_set_holds_only_sentinel() {
        let off = TagSet::off();
        assert_eq!(off.len(), 1);
        assert!(off.contains(OFF_TAG));
    }

    #[test]
    fn goal_debug_redacts_credential() {
        let goal = Goal {
            id: GoalId(1),
            remote_user: "alice".into(),
            remote_slug: "coding".into(),
            credential: "secret-token".into(),
            credential_valid: true,
            tags: TagSet::parse("code"),
            active_since: 0,
        };
        let debug = format!("{goal:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(goal.label(), "alice/coding");
    }

    #[test]
    fn remote_error_kind_round_trips_through_strings() {
        use std::str::FromStr;

        for kind in [
            RemoteErrorKind::Unauthorized,
            RemoteErrorKind::ProtocolVersionMismatch,
            RemoteErrorKind::NotFound,
            RemoteErrorKind::Transient,
        ] {
            let parsed = RemoteErrorKind::from_str(&kind.to_string()).expect("should parse");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn notification_kind_matches_variant() {
        let n = Notification::ResubmitNeeded {
            sample_id: SampleId(3),
            reason: "timeout".into(),
        };
        assert_eq!(n.kind(), NotificationKind::ResubmitNeeded);
        assert_eq!(n.kind().to_string(), "ResubmitNeeded");
    }

    #[test]
    fn tag_set_serializes_as_array() {
        let tags = TagSet::parse("b a");
        let json = serde_json::to_string(&tags).expect("should serialize");
        assert_eq!(json, r#"["a","b"]"#);
    }

    proptest::proptest! {
        #[test]
        fn parsing_is_stable_under_display(input in "[a-z \t]{0,40}") {
            let once = TagSet::parse(&input);
            let twice = TagSet::parse(&once.to_string());
            proptest::prop_assert_eq!(once, twice);
        }
    }
}
