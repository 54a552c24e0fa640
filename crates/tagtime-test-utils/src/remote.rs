// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable fake of the remote goal service.
//!
//! [`FakeRemote`] keeps the points each goal holds and answers through the
//! session listener from a spawned task, like a real transport's callback
//! thread. Scripted replies override the default behaviour one call at a
//! time; [`Reply::Silent`] never calls back, which exercises timeouts.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tagtime_core::{
    RemoteErrorKind, RemoteFailure, RemoteGoalSession, SessionConnector, SessionListener,
    SessionStatus, SubmissionHandle,
};

/// A scripted answer for one remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Succeed (a create returns this remote id, an open ignores it).
    Ok(String),
    Fail(RemoteErrorKind, String),
    /// Never call back.
    Silent,
}

impl Reply {
    pub fn fail(kind: RemoteErrorKind) -> Self {
        Reply::Fail(kind, format!("scripted {kind}"))
    }
}

/// A call observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Open {
        user: String,
        slug: String,
        credential: String,
    },
    Create {
        goal: String,
        value: f64,
        timestamp: i64,
        comment: String,
    },
    Delete {
        goal: String,
        remote_request_id: String,
    },
    Close,
}

/// A point held by the fake service.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePoint {
    pub value: f64,
    pub timestamp: i64,
    pub comment: String,
}

#[derive(Default)]
struct State {
    opens: VecDeque<Reply>,
    creates: VecDeque<Reply>,
    deletes: VecDeque<Reply>,
    calls: Vec<RemoteCall>,
    /// goal label -> remote id -> point
    points: BTreeMap<String, BTreeMap<String, RemotePoint>>,
}

/// Shared fake service; hand [`FakeRemote::connector`] to the code under test.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
    next_id: AtomicU64,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connector(self: &Arc<Self>) -> Arc<dyn SessionConnector> {
        Arc::new(FakeConnector {
            remote: Arc::clone(self),
        })
    }

    pub fn script_open(&self, reply: Reply) {
        self.state.lock().unwrap().opens.push_back(reply);
    }

    pub fn script_create(&self, reply: Reply) {
        self.state.lock().unwrap().creates.push_back(reply);
    }

    pub fn script_delete(&self, reply: Reply) {
        self.state.lock().unwrap().deletes.push_back(reply);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RemoteCall::Create { .. }))
            .count()
    }

    pub fn delete_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RemoteCall::Delete { .. }))
            .count()
    }

    /// Points currently held for `user/slug`.
    pub fn points(&self, goal: &str) -> BTreeMap<String, RemotePoint> {
        self.state
            .lock()
            .unwrap()
            .points
            .get(goal)
            .cloned()
            .unwrap_or_default()
    }

    /// Removes a point behind the client's back.
    pub fn drop_point(&self, goal: &str, remote_request_id: &str) {
        if let Some(points) = self.state.lock().unwrap().points.get_mut(goal) {
            points.remove(remote_request_id);
        }
    }

    fn record(&self, call: RemoteCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn open(&self, listener: Arc<dyn SessionListener>) {
        let reply = self
            .state
            .lock()
            .unwrap()
            .opens
            .pop_front()
            .unwrap_or_else(|| Reply::Ok(String::new()));
        let status = match reply {
            Reply::Ok(_) => SessionStatus::Opened,
            Reply::Fail(kind, message) => {
                SessionStatus::ClosedOnError(RemoteFailure::new(kind, message))
            }
            Reply::Silent => return,
        };
        tokio::spawn(async move { listener.on_status(status) });
    }

    fn create(
        &self,
        goal: &str,
        point: RemotePoint,
        handle: SubmissionHandle,
        listener: Arc<dyn SessionListener>,
    ) {
        let mut state = self.state.lock().unwrap();
        let result = match state.creates.pop_front() {
            Some(Reply::Fail(kind, message)) => Err(RemoteFailure::new(kind, message)),
            Some(Reply::Silent) => return,
            scripted => {
                let id = match scripted {
                    Some(Reply::Ok(id)) => id,
                    _ => format!("r{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
                };
                state
                    .points
                    .entry(goal.to_string())
                    .or_default()
                    .insert(id.clone(), point);
                Ok(id)
            }
        };
        drop(state);
        tokio::spawn(async move { listener.on_submission(handle, result) });
    }

    fn delete(
        &self,
        goal: &str,
        remote_request_id: &str,
        handle: SubmissionHandle,
        listener: Arc<dyn SessionListener>,
    ) {
        let mut state = self.state.lock().unwrap();
        let result = match state.deletes.pop_front() {
            None => {
                let removed = state
                    .points
                    .get_mut(goal)
                    .and_then(|points| points.remove(remote_request_id));
                match removed {
                    Some(_) => Ok(remote_request_id.to_string()),
                    None => Err(RemoteFailure::new(
                        RemoteErrorKind::NotFound,
                        format!("no datapoint {remote_request_id}"),
                    )),
                }
            }
            Some(Reply::Ok(_)) => {
                if let Some(points) = state.points.get_mut(goal) {
                    points.remove(remote_request_id);
                }
                Ok(remote_request_id.to_string())
            }
            Some(Reply::Fail(kind, message)) => Err(RemoteFailure::new(kind, message)),
            Some(Reply::Silent) => return,
        };
        drop(state);
        tokio::spawn(async move { listener.on_submission(handle, result) });
    }
}

struct FakeConnector {
    remote: Arc<FakeRemote>,
}

impl SessionConnector for FakeConnector {
    fn connect(&self, listener: Arc<dyn SessionListener>) -> Box<dyn RemoteGoalSession> {
        Box::new(FakeSession {
            remote: Arc::clone(&self.remote),
            listener,
            goal: String::new(),
            next_handle: 0,
        })
    }
}

struct FakeSession {
    remote: Arc<FakeRemote>,
    listener: Arc<dyn SessionListener>,
    goal: String,
    next_handle: u64,
}

impl FakeSession {
    fn handle(&mut self) -> SubmissionHandle {
        self.next_handle += 1;
        SubmissionHandle(self.next_handle)
    }
}

impl RemoteGoalSession for FakeSession {
    fn open(&mut self, user: &str, slug: &str, credential: &str) {
        self.goal = format!("{user}/{slug}");
        self.remote.record(RemoteCall::Open {
            user: user.to_string(),
            slug: slug.to_string(),
            credential: credential.to_string(),
        });
        self.remote.open(Arc::clone(&self.listener));
    }

    fn create_point(&mut self, value: f64, timestamp: i64, comment: &str) -> SubmissionHandle {
        let handle = self.handle();
        self.remote.record(RemoteCall::Create {
            goal: self.goal.clone(),
            value,
            timestamp,
            comment: comment.to_string(),
        });
        let point = RemotePoint {
            value,
            timestamp,
            comment: comment.to_string(),
        };
        self.remote
            .create(&self.goal, point, handle, Arc::clone(&self.listener));
        handle
    }

    fn delete_point(&mut self, remote_request_id: &str) -> SubmissionHandle {
        let handle = self.handle();
        self.remote.record(RemoteCall::Delete {
            goal: self.goal.clone(),
            remote_request_id: remote_request_id.to_string(),
        });
        self.remote.delete(
            &self.goal,
            remote_request_id,
            handle,
            Arc::clone(&self.listener),
        );
        handle
    }

    fn close(&mut self) {
        self.remote.record(RemoteCall::Close);
    }
}
