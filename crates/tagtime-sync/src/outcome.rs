// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of remote point operation results.

use tagtime_core::{RemoteErrorKind, RemoteFailure, SubmissionResult};

/// Which remote point operation produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
}

/// What the engine should do with the result of one remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The remote side holds (or, for deletes, no longer holds) the point.
    /// Carries the remote request id.
    Success(String),
    /// Worth another attempt later.
    Retryable(RemoteFailure),
    /// Will not succeed until the user intervenes.
    Fatal(RemoteFailure),
}

/// Maps a raw submission result onto an outcome.
///
/// `not_found_resolves` is set once a delete has been retried often enough
/// that a "not found" answer means the point is already gone.
pub fn classify(
    operation: Operation,
    result: SubmissionResult,
    remote_request_id: Option<&str>,
    not_found_resolves: bool,
) -> OperationOutcome {
    let failure = match result {
        Ok(id) => return OperationOutcome::Success(id),
        Err(failure) => failure,
    };
    match failure.kind {
        RemoteErrorKind::Unauthorized | RemoteErrorKind::ProtocolVersionMismatch => {
            OperationOutcome::Fatal(failure)
        }
        RemoteErrorKind::NotFound if operation == Operation::Delete && not_found_resolves => {
            OperationOutcome::Success(remote_request_id.unwrap_or_default().to_string())
        }
        RemoteErrorKind::NotFound | RemoteErrorKind::Transient => {
            OperationOutcome::Retryable(failure)
        }
    }
}
