// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Singleton scheduler state.

use rusqlite::{OptionalExtension, params};
use tagtime_core::{ScheduleState, TagTimeError};

use crate::database::{Database, map_tr_err};

pub async fn load(db: &Database) -> Result<Option<ScheduleState>, TagTimeError> {
    db.connection()
        .call(|conn| -> rusqlite::Result<Option<ScheduleState>> {
            conn.query_row(
                "SELECT seed, next_timestamp, gap_minutes FROM schedule_state WHERE id = 1",
                [],
                |row| {
                    Ok(ScheduleState {
                        seed: row.get(0)?,
                        next_timestamp: row.get(1)?,
                        gap_minutes: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Writes seed, next timestamp and gap in one statement.
pub async fn save(db: &Database, state: &ScheduleState) -> Result<(), TagTimeError> {
    let state = *state;
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            conn.execute(
                "INSERT INTO schedule_state (id, seed, next_timestamp, gap_minutes) \
                 VALUES (1, ?1, ?2, ?3) \
                 ON CONFLICT(id) DO UPDATE SET seed = excluded.seed, \
                 next_timestamp = excluded.next_timestamp, gap_minutes = excluded.gap_minutes",
                params![state.seed, state.next_timestamp, state.gap_minutes],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
