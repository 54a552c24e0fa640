// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sample (ping) records and their tags.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, params};
use tagtime_core::{Sample, SampleId, TagSet, TagTimeError};

use crate::database::{Database, map_tr_err};

/// Tags of one sample, read on an open connection or transaction.
fn load_tags(conn: &Connection, sample_id: i64) -> rusqlite::Result<TagSet> {
    let mut stmt = conn.prepare_cached("SELECT tag FROM sample_tags WHERE sample_id = ?1")?;
    let tags = stmt
        .query_map(params![sample_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<TagSet>>()?;
    Ok(tags)
}

fn insert_tags(conn: &Connection, sample_id: i64, tags: &TagSet) -> rusqlite::Result<()> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO sample_tags (sample_id, tag) VALUES (?1, ?2)")?;
    for tag in tags.iter() {
        stmt.execute(params![sample_id, tag])?;
    }
    Ok(())
}

fn sample_exists(conn: &Connection, sample_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM samples WHERE id = ?1",
        params![sample_id],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

fn not_found(id: SampleId) -> TagTimeError {
    TagTimeError::NotFound {
        entity: "sample",
        id: id.to_string(),
    }
}

/// Records a sample, or returns the id of the sample already recorded at
/// `timestamp`.
pub async fn create_sample(
    db: &Database,
    timestamp: i64,
    tags: &TagSet,
    period_minutes: u32,
) -> Result<SampleId, TagTimeError> {
    let tags = tags.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<i64> {
            let tx = conn.transaction()?;
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM samples WHERE timestamp = ?1",
                    params![timestamp],
                    |row| row.get(0),
                )
                .optional()?;
            let id = match existing {
                Some(id) => id,
                None => {
                    tx.execute(
                        "INSERT INTO samples (timestamp, period_minutes) VALUES (?1, ?2)",
                        params![timestamp, period_minutes],
                    )?;
                    let id = tx.last_insert_rowid();
                    insert_tags(&tx, id, &tags)?;
                    id
                }
            };
            tx.commit()?;
            Ok(id)
        })
        .await
        .map(SampleId)
        .map_err(map_tr_err)
}

pub async fn get_sample(db: &Database, id: SampleId) -> Result<Option<Sample>, TagTimeError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<Sample>> {
            let row: Option<(i64, u32)> = conn
                .query_row(
                    "SELECT timestamp, period_minutes FROM samples WHERE id = ?1",
                    params![id.0],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            match row {
                Some((timestamp, period_minutes)) => Ok(Some(Sample {
                    id,
                    timestamp,
                    period_minutes,
                    tags: load_tags(conn, id.0)?,
                })),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn tags_for_sample(db: &Database, id: SampleId) -> Result<TagSet, TagTimeError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<TagSet>> {
            if !sample_exists(conn, id.0)? {
                return Ok(None);
            }
            load_tags(conn, id.0).map(Some)
        })
        .await
        .map_err(map_tr_err)?
        .ok_or_else(|| not_found(id))
}

/// Replaces the tag set of a sample in one transaction.
pub async fn update_tags(db: &Database, id: SampleId, tags: &TagSet) -> Result<(), TagTimeError> {
    let tags = tags.clone();
    let updated = db
        .connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let tx = conn.transaction()?;
            if !sample_exists(&tx, id.0)? {
                return Ok(false);
            }
            tx.execute("DELETE FROM sample_tags WHERE sample_id = ?1", params![id.0])?;
            insert_tags(&tx, id.0, &tags)?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)?;
    if updated { Ok(()) } else { Err(not_found(id)) }
}

pub async fn tag_usage_counts(db: &Database) -> Result<HashMap<String, u64>, TagTimeError> {
    db.connection()
        .call(|conn| -> rusqlite::Result<HashMap<String, u64>> {
            let mut stmt =
                conn.prepare("SELECT tag, COUNT(*) FROM sample_tags GROUP BY tag")?;
            let counts = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
                })?
                .collect::<rusqlite::Result<HashMap<_, _>>>()?;
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}

/// Newest samples first.
pub async fn recent_samples(db: &Database, limit: usize) -> Result<Vec<Sample>, TagTimeError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> rusqlite::Result<Vec<Sample>> {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, period_minutes FROM samples \
                 ORDER BY timestamp DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<rusqlite::Result<Vec<(i64, i64, u32)>>>()?;
            rows.into_iter()
                .map(|(id, timestamp, period_minutes)| {
                    Ok(Sample {
                        id: SampleId(id),
                        timestamp,
                        period_minutes,
                        tags: load_tags(conn, id)?,
                    })
                })
                .collect()
        })
        .await
        .map_err(map_tr_err)
}
