// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for TagTime.
//!
//! This crate provides the data model, the error taxonomy, and the
//! collaborator traits (stores, remote session, notifications, clock) shared
//! by the scheduler, the sync engine and their adapters.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TagTimeError;
pub use types::{
    Goal, GoalId, HealthStatus, NewGoal, NewPoint, Notification, NotificationKind, OFF_TAG,
    Pairing, Point, PointId, RemoteErrorKind, RemoteFailure, Sample, SampleId, ScheduleState,
    SessionStatus, SubmissionHandle, SubmissionResult, TagSet,
};

pub use traits::{
    Clock, GoalStore, NotificationSink, RemoteGoalSession, SampleStore, ScheduleStore,
    SessionConnector, SessionListener, SystemClock, WakeAlarm,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagtime_error_has_all_variants() {
        let _config = TagTimeError::Config("test".into());
        let storage = TagTimeError::storage(std::io::Error::other("disk full"));
        assert!(storage.is_storage());
        let not_found = TagTimeError::NotFound {
            entity: "sample",
            id: "7".into(),
        };
        assert_eq!(not_found.to_string(), "sample 7 not found");
        let _invalid = TagTimeError::InvalidInput("test".into());
    }

    #[test]
    fn all_traits_are_object_safe() {
        fn _schedule(_: &dyn ScheduleStore) {}
        fn _samples(_: &dyn SampleStore) {}
        fn _goals(_: &dyn GoalStore) {}
        fn _session(_: &dyn RemoteGoalSession) {}
        fn _connector(_: &dyn SessionConnector) {}
        fn _listener(_: &dyn SessionListener) {}
        fn _sink(_: &dyn NotificationSink) {}
        fn _clock(_: &dyn Clock) {}
        fn _alarm(_: &dyn WakeAlarm) {}
    }
}
