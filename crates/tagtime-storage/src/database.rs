// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread, which
//! makes the [`Database`] handle the only writer. Do not open a second
//! connection for writes.

use std::path::Path;

use tagtime_core::TagTimeError;
use tracing::{debug, info};

use crate::migrations;

/// Path understood as a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Handle to the single SQLite connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path`, applies PRAGMAs and
    /// runs pending migrations. `":memory:"` opens a private in-memory database.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, TagTimeError> {
        let conn = if path == IN_MEMORY {
            tokio_rusqlite::Connection::open_in_memory()
                .await
                .map_err(TagTimeError::storage)?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(TagTimeError::storage)?;
            }
            tokio_rusqlite::Connection::open(path)
                .await
                .map_err(TagTimeError::storage)?
        };

        let use_wal = wal_mode && path != IN_MEMORY;
        let applied = conn
            .call(move |conn| -> rusqlite::Result<Result<usize, String>> {
                if use_wal {
                    conn.pragma_update(None, "journal_mode", "WAL")?;
                }
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.pragma_update(None, "busy_timeout", 5000)?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                Ok(migrations::run_migrations(conn).map_err(|e| e.to_string()))
            })
            .await
            .map_err(map_tr_err)?
            .map_err(|message| TagTimeError::Storage {
                source: format!("migration failed: {message}").into(),
            })?;

        if applied > 0 {
            info!(path, applied, "database migrations applied");
        }
        debug!(path, wal = use_wal, "database opened");
        Ok(Self { conn })
    }

    /// Opens a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, TagTimeError> {
        Self::open(IN_MEMORY, false).await
    }

    /// The underlying connection. Query modules call through it.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), TagTimeError> {
        checkpoint(&self.conn).await?;
        self.conn.close().await.map_err(TagTimeError::storage)?;
        debug!("database closed");
        Ok(())
    }
}

/// Folds the WAL back into the main database file.
pub(crate) async fn checkpoint(conn: &tokio_rusqlite::Connection) -> Result<(), TagTimeError> {
    conn.call(|conn| -> rusqlite::Result<()> {
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    })
    .await
    .map_err(map_tr_err)
}

pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TagTimeError {
    TagTimeError::Storage {
        source: Box::new(e),
    }
}
