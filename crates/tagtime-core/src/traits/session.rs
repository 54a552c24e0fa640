// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback-driven remote goal session.
//!
//! Every method on [`RemoteGoalSession`] returns immediately. Outcomes arrive
//! later through the [`SessionListener`] handed to
//! [`SessionConnector::connect`], usually on another task or thread.

use std::sync::Arc;

use crate::types::{SessionStatus, SubmissionHandle, SubmissionResult};

/// Receives session callbacks. Implementations must only hand the event off
/// (channel send, signal) and never block.
pub trait SessionListener: Send + Sync {
    fn on_status(&self, status: SessionStatus);

    fn on_submission(&self, handle: SubmissionHandle, result: SubmissionResult);
}

/// One session against one remote goal.
pub trait RemoteGoalSession: Send {
    /// Starts opening the session. Completion is reported via `on_status`.
    fn open(&mut self, user: &str, slug: &str, credential: &str);

    /// Submits a new point. Completion is reported via `on_submission`.
    fn create_point(&mut self, value: f64, timestamp: i64, comment: &str) -> SubmissionHandle;

    /// Submits deletion of a previously created point.
    fn delete_point(&mut self, remote_request_id: &str) -> SubmissionHandle;

    /// Closes the session. Pending submissions may be abandoned.
    fn close(&mut self);
}

/// Produces fresh sessions wired to a listener.
pub trait SessionConnector: Send + Sync {
    fn connect(&self, listener: Arc<dyn SessionListener>) -> Box<dyn RemoteGoalSession>;
}
