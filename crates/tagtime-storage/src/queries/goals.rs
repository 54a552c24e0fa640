// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Goal registrations and their tag sets.

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tagtime_core::{Goal, GoalId, NewGoal, TagSet, TagTimeError};

use crate::database::{Database, map_tr_err};

const GOAL_COLUMNS: &str =
    "id, remote_user, remote_slug, credential, credential_valid, active_since";

fn load_tags(conn: &Connection, goal_id: i64) -> rusqlite::Result<TagSet> {
    let mut stmt = conn.prepare_cached("SELECT tag FROM goal_tags WHERE goal_id = ?1")?;
    let tags = stmt
        .query_map(params![goal_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<TagSet>>()?;
    Ok(tags)
}

/// Maps a row selected with [`GOAL_COLUMNS`]; tags are filled in afterwards.
fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: GoalId(row.get(0)?),
        remote_user: row.get(1)?,
        remote_slug: row.get(2)?,
        credential: row.get(3)?,
        credential_valid: row.get(4)?,
        tags: TagSet::new(),
        active_since: row.get(5)?,
    })
}

/// Inserts a goal or re-links the existing `(user, slug)`.
///
/// The watermark of a re-linked goal becomes `max(previous, now)`.
pub async fn link_goal(db: &Database, goal: &NewGoal, now: i64) -> Result<GoalId, TagTimeError> {
    let goal = goal.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<i64> {
            let tx = conn.transaction()?;
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM goals WHERE remote_user = ?1 AND remote_slug = ?2",
                    params![goal.remote_user, goal.remote_slug],
                    |row| row.get(0),
                )
                .optional()?;

            let id = match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE goals SET credential = ?1, credential_valid = 1, \
                         active_since = MAX(active_since, ?2) WHERE id = ?3",
                        params![goal.credential, now, id],
                    )?;
                    tx.execute("DELETE FROM goal_tags WHERE goal_id = ?1", params![id])?;
                    id
                }
                None => {
                    tx.execute(
                        "INSERT INTO goals (remote_user, remote_slug, credential, \
                         credential_valid, active_since) VALUES (?1, ?2, ?3, 1, ?4)",
                        params![goal.remote_user, goal.remote_slug, goal.credential, now],
                    )?;
                    tx.last_insert_rowid()
                }
            };

            {
                let mut stmt =
                    tx.prepare_cached("INSERT INTO goal_tags (goal_id, tag) VALUES (?1, ?2)")?;
                for tag in goal.tags.iter() {
                    stmt.execute(params![id, tag])?;
                }
            }
            tx.commit()?;
            Ok(id)
        })
        .await
        .map(GoalId)
        .map_err(map_tr_err)
}

pub async fn get_goal(db: &Database, id: GoalId) -> Result<Option<Goal>, TagTimeError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<Goal>> {
            let goal = conn
                .query_row(
                    &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1"),
                    params![id.0],
                    goal_from_row,
                )
                .optional()?;
            match goal {
                Some(mut goal) => {
                    goal.tags = load_tags(conn, id.0)?;
                    Ok(Some(goal))
                }
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_goals(db: &Database) -> Result<Vec<Goal>, TagTimeError> {
    db.connection()
        .call(|conn| -> rusqlite::Result<Vec<Goal>> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GOAL_COLUMNS} FROM goals ORDER BY remote_user, remote_slug"
            ))?;
            let mut goals = stmt
                .query_map([], goal_from_row)?
                .collect::<rusqlite::Result<Vec<Goal>>>()?;
            for goal in &mut goals {
                goal.tags = load_tags(conn, goal.id.0)?;
            }
            Ok(goals)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes a goal; its tags, points and pairings go with it via cascades.
pub async fn remove_goal(db: &Database, id: GoalId) -> Result<bool, TagTimeError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let removed = conn.execute("DELETE FROM goals WHERE id = ?1", params![id.0])?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Goals sharing at least one tag with `tags`, in id order.
pub async fn goals_matching_tags(
    db: &Database,
    tags: &TagSet,
) -> Result<Vec<GoalId>, TagTimeError> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }
    let tags: Vec<String> = tags.iter().map(str::to_string).collect();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Vec<GoalId>> {
            let placeholders = vec!["?"; tags.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT DISTINCT goal_id FROM goal_tags WHERE tag IN ({placeholders}) \
                 ORDER BY goal_id"
            ))?;
            let ids = stmt
                .query_map(params_from_iter(tags.iter()), |row| row.get(0).map(GoalId))?
                .collect::<rusqlite::Result<Vec<GoalId>>>()?;
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn watermark(db: &Database, id: GoalId) -> Result<Option<i64>, TagTimeError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<i64>> {
            conn.query_row(
                "SELECT active_since FROM goals WHERE id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn invalidate_credential(db: &Database, id: GoalId) -> Result<(), TagTimeError> {
    let updated = db
        .connection()
        .call(move |conn| -> rusqlite::Result<usize> {
            conn.execute(
                "UPDATE goals SET credential_valid = 0 WHERE id = ?1",
                params![id.0],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(TagTimeError::NotFound {
            entity: "goal",
            id: id.to_string(),
        });
    }
    Ok(())
}
