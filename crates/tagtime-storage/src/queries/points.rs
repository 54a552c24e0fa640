// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Points and their pairings with samples.
//!
//! A point and its pairing are always written and removed together.

use rusqlite::{OptionalExtension, params};
use tagtime_core::{GoalId, NewPoint, Pairing, Point, PointId, SampleId, TagTimeError};

use crate::database::{Database, map_tr_err};

pub async fn pairings_for_sample(
    db: &Database,
    sample_id: SampleId,
) -> Result<Vec<Pairing>, TagTimeError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<Vec<Pairing>> {
            let mut stmt = conn.prepare(
                "SELECT goal_id, point_id FROM point_pairings WHERE sample_id = ?1 \
                 ORDER BY point_id",
            )?;
            let pairings = stmt
                .query_map(params![sample_id.0], |row| {
                    Ok(Pairing {
                        sample_id,
                        goal_id: GoalId(row.get(0)?),
                        point_id: PointId(row.get(1)?),
                    })
                })?
                .collect::<rusqlite::Result<Vec<Pairing>>>()?;
            Ok(pairings)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_point(db: &Database, id: PointId) -> Result<Option<Point>, TagTimeError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<Point>> {
            conn.query_row(
                "SELECT remote_request_id, value, timestamp, comment, goal_id \
                 FROM points WHERE id = ?1",
                params![id.0],
                |row| {
                    Ok(Point {
                        id,
                        remote_request_id: row.get(0)?,
                        value: row.get(1)?,
                        timestamp: row.get(2)?,
                        comment: row.get(3)?,
                        goal_id: GoalId(row.get(4)?),
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Inserts an unconfirmed point and its pairing in one transaction.
///
/// The `(sample, goal)` uniqueness constraint rejects a second point for the
/// same goal; nothing is written in that case.
pub async fn create_pairing(
    db: &Database,
    sample_id: SampleId,
    point: &NewPoint,
) -> Result<PointId, TagTimeError> {
    let point = point.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<i64> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO points (goal_id, remote_request_id, value, timestamp, comment) \
                 VALUES (?1, NULL, ?2, ?3, ?4)",
                params![point.goal_id.0, point.value, point.timestamp, point.comment],
            )?;
            let point_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO point_pairings (sample_id, point_id, goal_id) VALUES (?1, ?2, ?3)",
                params![sample_id.0, point_id, point.goal_id.0],
            )?;
            tx.commit()?;
            Ok(point_id)
        })
        .await
        .map(PointId)
        .map_err(map_tr_err)
}

pub async fn confirm_point(
    db: &Database,
    id: PointId,
    remote_request_id: &str,
) -> Result<(), TagTimeError> {
    let remote_request_id = remote_request_id.to_string();
    let updated = db
        .connection()
        .call(move |conn| -> rusqlite::Result<usize> {
            conn.execute(
                "UPDATE points SET remote_request_id = ?1 WHERE id = ?2",
                params![remote_request_id, id.0],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(TagTimeError::NotFound {
            entity: "point",
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Removes the pairing and its point in one transaction. Missing rows are
/// not an error.
pub async fn delete_pairing(
    db: &Database,
    sample_id: SampleId,
    point_id: PointId,
) -> Result<(), TagTimeError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM point_pairings WHERE sample_id = ?1 AND point_id = ?2",
                params![sample_id.0, point_id.0],
            )?;
            tx.execute("DELETE FROM points WHERE id = ?1", params![point_id.0])?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
