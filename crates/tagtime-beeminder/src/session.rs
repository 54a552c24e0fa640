// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback-driven session over [`BeeminderClient`].

use std::sync::Arc;

use tagtime_core::{
    RemoteErrorKind, RemoteFailure, RemoteGoalSession, SessionConnector, SessionListener,
    SessionStatus, SubmissionHandle,
};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::BeeminderClient;

#[derive(Clone)]
struct Target {
    user: String,
    slug: String,
    token: String,
}

/// Produces [`BeeminderSession`]s sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct BeeminderConnector {
    client: BeeminderClient,
}

impl BeeminderConnector {
    pub fn new(client: BeeminderClient) -> Self {
        Self { client }
    }
}

impl SessionConnector for BeeminderConnector {
    fn connect(&self, listener: Arc<dyn SessionListener>) -> Box<dyn RemoteGoalSession> {
        Box::new(BeeminderSession {
            client: self.client.clone(),
            listener,
            target: None,
            next_handle: 0,
            tasks: Vec::new(),
        })
    }
}

/// One goal session. Must be driven from inside a tokio runtime.
pub struct BeeminderSession {
    client: BeeminderClient,
    listener: Arc<dyn SessionListener>,
    target: Option<Target>,
    next_handle: u64,
    tasks: Vec<JoinHandle<()>>,
}

impl BeeminderSession {
    fn handle(&mut self) -> SubmissionHandle {
        self.next_handle += 1;
        SubmissionHandle(self.next_handle)
    }

    /// Runs `request` on a spawned task and reports its result as the
    /// completion of `handle`.
    fn submit<F, Fut>(&mut self, request: F) -> SubmissionHandle
    where
        F: FnOnce(BeeminderClient, Target) -> Fut,
        Fut: Future<Output = Result<String, RemoteFailure>> + Send + 'static,
    {
        let handle = self.handle();
        let listener = Arc::clone(&self.listener);
        let Some(target) = self.target.clone() else {
            let failure = RemoteFailure::new(RemoteErrorKind::Transient, "session is not open");
            self.tasks.push(tokio::spawn(async move {
                listener.on_submission(handle, Err(failure));
            }));
            return handle;
        };
        let fut = request(self.client.clone(), target);
        self.tasks.push(tokio::spawn(async move {
            listener.on_submission(handle, fut.await);
        }));
        handle
    }
}

impl RemoteGoalSession for BeeminderSession {
    fn open(&mut self, user: &str, slug: &str, credential: &str) {
        let target = Target {
            user: user.to_string(),
            slug: slug.to_string(),
            token: credential.to_string(),
        };
        self.target = Some(target.clone());
        let client = self.client.clone();
        let listener = Arc::clone(&self.listener);
        self.tasks.push(tokio::spawn(async move {
            let status = match client
                .check_goal(&target.user, &target.slug, &target.token)
                .await
            {
                Ok(()) => SessionStatus::Opened,
                Err(failure) => SessionStatus::ClosedOnError(failure),
            };
            listener.on_status(status);
        }));
    }

    fn create_point(&mut self, value: f64, timestamp: i64, comment: &str) -> SubmissionHandle {
        let comment = comment.to_string();
        self.submit(move |client, target| async move {
            client
                .create_datapoint(
                    &target.user,
                    &target.slug,
                    &target.token,
                    value,
                    timestamp,
                    &comment,
                )
                .await
        })
    }

    fn delete_point(&mut self, remote_request_id: &str) -> SubmissionHandle {
        let id = remote_request_id.to_string();
        self.submit(move |client, target| async move {
            client
                .delete_datapoint(&target.user, &target.slug, &target.token, &id)
                .await
        })
    }

    fn close(&mut self) {
        let abandoned = self.tasks.iter().filter(|t| !t.is_finished()).count();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(target) = self.target.take() {
            debug!(user = %target.user, slug = %target.slug, abandoned, "session closed");
        }
    }
}

impl Drop for BeeminderSession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
