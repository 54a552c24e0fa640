// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for TagTime.

use thiserror::Error;

/// The primary error type used across the store traits, the scheduler and the
/// sync engine.
#[derive(Debug, Error)]
pub enum TagTimeError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Local persistence failure. The current operation is aborted; on-disk
    /// state is left as of the last committed step.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Caller supplied a value the operation cannot accept.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl TagTimeError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// True for errors raised by local persistence.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}
