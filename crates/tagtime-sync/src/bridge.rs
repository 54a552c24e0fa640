// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential bridge over the callback-driven remote session.
//!
//! Session callbacks arrive on whatever task or thread the session uses. The
//! listener only forwards them into an unbounded channel; the waiting
//! reconciliation task reads that channel under a [`tokio::time::timeout`], so
//! both handshakes are bounded and observe the (possibly paused) tokio clock.

use std::sync::Arc;
use std::time::Duration;

use tagtime_core::{
    Goal, RemoteErrorKind, RemoteFailure, RemoteGoalSession, SessionConnector, SessionListener,
    SessionStatus, SubmissionHandle, SubmissionResult,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A single point operation against one goal.
#[derive(Debug, Clone, PartialEq)]
pub enum PointRequest {
    Create {
        value: f64,
        timestamp: i64,
        comment: String,
    },
    Delete {
        remote_request_id: String,
    },
}

#[derive(Debug)]
enum SessionEvent {
    Status(SessionStatus),
    Submission(SubmissionHandle, SubmissionResult),
}

struct ChannelListener {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionListener for ChannelListener {
    fn on_status(&self, status: SessionStatus) {
        // The receiver is gone once the bridge has given up; late events are dropped.
        let _ = self.tx.send(SessionEvent::Status(status));
    }

    fn on_submission(&self, handle: SubmissionHandle, result: SubmissionResult) {
        let _ = self.tx.send(SessionEvent::Submission(handle, result));
    }
}

/// Opens a session per operation and waits for both completion callbacks.
#[derive(Clone)]
pub struct SessionBridge {
    connector: Arc<dyn SessionConnector>,
    timeout: Duration,
}

impl SessionBridge {
    pub fn new(connector: Arc<dyn SessionConnector>, timeout: Duration) -> Self {
        Self { connector, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `request` against `goal`'s session.
    ///
    /// Returns the remote request id on success. Timeouts and sessions that
    /// close unexpectedly are reported as [`RemoteErrorKind::Transient`]. The
    /// session is always closed before returning.
    pub async fn submit(&self, goal: &Goal, request: &PointRequest) -> SubmissionResult {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener = Arc::new(ChannelListener { tx });
        let mut session = self.connector.connect(listener);

        let result = self.run(session.as_mut(), &mut rx, goal, request).await;
        session.close();
        result
    }

    async fn run(
        &self,
        session: &mut dyn RemoteGoalSession,
        rx: &mut mpsc::UnboundedReceiver<SessionEvent>,
        goal: &Goal,
        request: &PointRequest,
    ) -> SubmissionResult {
        session.open(&goal.remote_user, &goal.remote_slug, &goal.credential);
        match tokio::time::timeout(self.timeout, wait_opened(rx)).await {
            Ok(Ok(())) => debug!(goal = %goal.label(), "session opened"),
            Ok(Err(failure)) => return Err(failure),
            Err(_) => {
                warn!(goal = %goal.label(), timeout = ?self.timeout, "session open timed out");
                return Err(timed_out("session open", self.timeout));
            }
        }

        let handle = match request {
            PointRequest::Create {
                value,
                timestamp,
                comment,
            } => session.create_point(*value, *timestamp, comment),
            PointRequest::Delete { remote_request_id } => session.delete_point(remote_request_id),
        };

        match tokio::time::timeout(self.timeout, wait_submission(rx, handle)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(goal = %goal.label(), timeout = ?self.timeout, "submission timed out");
                Err(timed_out("submission", self.timeout))
            }
        }
    }
}

fn timed_out(phase: &str, timeout: Duration) -> RemoteFailure {
    RemoteFailure::new(
        RemoteErrorKind::Transient,
        format!("{phase} timed out after {}s", timeout.as_secs()),
    )
}

fn dropped() -> RemoteFailure {
    RemoteFailure::new(RemoteErrorKind::Transient, "session dropped its listener")
}

async fn wait_opened(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Result<(), RemoteFailure> {
    loop {
        match rx.recv().await {
            Some(SessionEvent::Status(SessionStatus::Opened)) => return Ok(()),
            Some(SessionEvent::Status(SessionStatus::ClosedOnError(failure))) => {
                return Err(failure);
            }
            Some(SessionEvent::Status(SessionStatus::Closed)) => {
                return Err(RemoteFailure::new(
                    RemoteErrorKind::Transient,
                    "session closed before opening",
                ));
            }
            // Stray submission results cannot belong to this session yet.
            Some(SessionEvent::Submission(..)) => continue,
            None => return Err(dropped()),
        }
    }
}

async fn wait_submission(
    rx: &mut mpsc::UnboundedReceiver<SessionEvent>,
    handle: SubmissionHandle,
) -> SubmissionResult {
    loop {
        match rx.recv().await {
            Some(SessionEvent::Submission(h, result)) if h == handle => return result,
            Some(SessionEvent::Submission(..)) | Some(SessionEvent::Status(SessionStatus::Opened)) => {
                continue;
            }
            Some(SessionEvent::Status(SessionStatus::ClosedOnError(failure))) => {
                return Err(failure);
            }
            Some(SessionEvent::Status(SessionStatus::Closed)) => {
                return Err(RemoteFailure::new(
                    RemoteErrorKind::Transient,
                    "session closed before the submission completed",
                ));
            }
            None => return Err(dropped()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagtime_core::{GoalId, TagSet};
    use tagtime_test_utils::{FakeRemote, RemoteCall, Reply};

    fn goal() -> Goal {
        Goal {
            id: GoalId(1),
            remote_user: "alice".into(),
            remote_slug: "work".into(),
            credential: "token".into(),
            credential_valid: true,
            tags: TagSet::parse("work"),
            active_since: 0,
        }
    }

    fn create() -> PointRequest {
        PointRequest::Create {
            value: 0.75,
            timestamp: 1_700_000_000,
            comment: "TagTime ping: work".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_returns_remote_id_and_closes_session() {
        let remote = FakeRemote::new();
        let bridge = SessionBridge::new(remote.connector(), Duration::from_secs(30));

        let id = bridge.submit(&goal(), &create()).await.unwrap();
        assert_eq!(id, "r1");
        assert_eq!(remote.points("alice/work").len(), 1);
        assert!(matches!(remote.calls().last(), Some(RemoteCall::Close)));
    }

    #[tokio::test(start_paused = true)]
    async fn open_error_is_reported_without_submitting() {
        let remote = FakeRemote::new();
        remote.script_open(Reply::fail(RemoteErrorKind::Unauthorized));
        let bridge = SessionBridge::new(remote.connector(), Duration::from_secs(30));

        let err = bridge.submit(&goal(), &create()).await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Unauthorized);
        assert_eq!(remote.create_calls(), 0);
        assert!(matches!(remote.calls().last(), Some(RemoteCall::Close)));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_open_times_out() {
        let remote = FakeRemote::new();
        remote.script_open(Reply::Silent);
        let bridge = SessionBridge::new(remote.connector(), Duration::from_secs(30));

        let started = tokio::time::Instant::now();
        let err = bridge.submit(&goal(), &create()).await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Transient);
        assert!(err.message.contains("session open timed out"));
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_submission_times_out() {
        let remote = FakeRemote::new();
        remote.script_create(Reply::Silent);
        let bridge = SessionBridge::new(remote.connector(), Duration::from_secs(30));

        let err = bridge.submit(&goal(), &create()).await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Transient);
        assert!(err.message.contains("submission timed out"));
        assert!(remote.points("alice/work").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_of_missing_point_reports_not_found() {
        let remote = FakeRemote::new();
        let bridge = SessionBridge::new(remote.connector(), Duration::from_secs(30));

        let err = bridge
            .submit(
                &goal(),
                &PointRequest::Delete {
                    remote_request_id: "r42".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::NotFound);
    }
}
