// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot subcommands.

use chrono::{DateTime, Local};
use tagtime_core::{
    GoalId, GoalStore, HealthStatus, NewGoal, SampleId, SampleStore, ScheduleStore, TagSet,
    TagTimeError,
};

use crate::app::App;

/// Local time for a unix timestamp, or the raw number if it is out of range.
pub fn format_time(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| {
            t.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| timestamp.to_string())
}

fn join_tags(tags: &[String]) -> TagSet {
    TagSet::parse(&tags.join(" "))
}

pub async fn ping(app: &App) -> Result<(), TagTimeError> {
    let report = app.scheduler.activate().await?;
    println!(
        "recorded {} sample(s) ({} missed, {} to tag); next ping at {}",
        report.recorded.len(),
        report.retro,
        report.prompted,
        format_time(report.next_timestamp)
    );
    Ok(())
}

pub async fn tag(app: &App, sample_id: i64, tags: &[String]) -> Result<(), TagTimeError> {
    let sample_id = SampleId(sample_id);
    let tags = join_tags(tags);
    app.queue.edit_tags(sample_id, tags.clone()).await?;
    app.queue.wait_idle().await;

    let stats = app.queue.stats();
    println!("sample {sample_id} tagged: {tags}");
    if stats.gave_up > 0 {
        println!("goal sync gave up; see the log for details");
    }
    Ok(())
}

pub async fn goal_link(
    app: &App,
    user: &str,
    slug: &str,
    token: &str,
    tags: &[String],
) -> Result<(), TagTimeError> {
    let tags = join_tags(tags);
    if tags.is_empty() {
        return Err(TagTimeError::InvalidInput(
            "a goal needs at least one tag".into(),
        ));
    }
    let goal = NewGoal {
        remote_user: user.to_string(),
        remote_slug: slug.to_string(),
        credential: token.to_string(),
        tags,
    };
    let id = app.store.link_goal(&goal, app.clock.now()).await?;
    println!("goal {id} linked: {user}/{slug} <- {}", goal.tags);
    Ok(())
}

pub async fn goal_list(app: &App) -> Result<(), TagTimeError> {
    let goals = app.store.list_goals().await?;
    if goals.is_empty() {
        println!("no goals linked");
        return Ok(());
    }
    for goal in goals {
        let flag = if goal.credential_valid {
            ""
        } else {
            "  [token rejected]"
        };
        println!(
            "{:>4}  {:<24}  {:<30}  since {}{flag}",
            goal.id.0,
            goal.label(),
            goal.tags.to_string(),
            format_time(goal.active_since)
        );
    }
    Ok(())
}

pub async fn goal_remove(app: &App, id: i64) -> Result<(), TagTimeError> {
    if app.store.remove_goal(GoalId(id)).await? {
        println!("goal {id} removed");
        Ok(())
    } else {
        Err(TagTimeError::NotFound {
            entity: "goal",
            id: id.to_string(),
        })
    }
}

pub async fn log(app: &App, limit: usize) -> Result<(), TagTimeError> {
    for sample in app.store.recent_samples(limit).await? {
        println!(
            "{:>6}  {}  {}",
            sample.id.0,
            format_time(sample.timestamp),
            sample.tags
        );
    }
    Ok(())
}

pub async fn schedule(app: &App, count: usize) -> Result<(), TagTimeError> {
    for timestamp in app.scheduler.upcoming(count).await? {
        println!("{}  ({timestamp})", format_time(timestamp));
    }
    Ok(())
}

pub async fn status(app: &App) -> Result<(), TagTimeError> {
    let health = match app.store.health_check().await? {
        HealthStatus::Healthy => "ok".to_string(),
        HealthStatus::Degraded(why) => format!("degraded ({why})"),
        HealthStatus::Unhealthy(why) => format!("unhealthy ({why})"),
    };
    let goals = app.store.list_goals().await?;
    let rejected = goals.iter().filter(|g| !g.credential_valid).count();

    println!();
    println!("  tagtime status");
    println!("  {}", "-".repeat(35));
    println!("    Database:  {} ({health})", app.config.storage.database_path);
    match app.store.load_schedule().await? {
        Some(state) => println!(
            "    Next ping: {} (gap {} min)",
            format_time(state.next_timestamp),
            state.gap_minutes
        ),
        None => println!("    Next ping: not scheduled yet (run `tagtime ping`)"),
    }
    println!("    Goals:     {} linked, {rejected} with rejected token", goals.len());
    println!(
        "    Sync:      {}",
        if app.config.sync.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!();
    Ok(())
}
