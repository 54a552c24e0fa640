// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tagtime serve`: the long-running daemon.
//!
//! Activates the scheduler at start and whenever the armed wake-up fires,
//! and feeds tag edits read from stdin into the sync queue. Stops on SIGINT
//! or SIGTERM.

use tagtime_core::{SampleId, TagSet, TagTimeError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::App;

/// Parses a `<sample-id> <tags...>` edit line.
pub fn parse_edit_line(line: &str) -> Result<(SampleId, TagSet), TagTimeError> {
    let line = line.trim();
    let (id, tags) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let id = id
        .parse::<i64>()
        .map_err(|_| TagTimeError::InvalidInput(format!("expected a sample id, got {id:?}")))?;
    Ok((SampleId(id), TagSet::parse(tags)))
}

async fn activate(app: &App) {
    match app.scheduler.activate().await {
        Ok(report) => debug!(
            recorded = report.recorded.len(),
            next_timestamp = report.next_timestamp,
            "activation complete"
        ),
        // The scheduler re-arms itself shortly after a failure.
        Err(e) => error!(error = %e, "activation failed"),
    }
}

pub async fn run_serve(app: &App, cancel: CancellationToken) -> Result<(), TagTimeError> {
    info!(
        gap_minutes = app.config.schedule.gap_minutes,
        sync = app.config.sync.enabled,
        "tagtime serve starting"
    );
    activate(app).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            fired = app.timer.wait(&cancel) => {
                if !fired {
                    break;
                }
                activate(app).await;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match parse_edit_line(&line) {
                    Ok((sample_id, tags)) => {
                        if let Err(e) = app.queue.edit_tags(sample_id, tags).await {
                            warn!(sample_id = %sample_id, error = %e, "tag edit rejected");
                        }
                    }
                    Err(e) => warn!(error = %e, "ignoring malformed edit line"),
                },
                Ok(None) => {
                    debug!("stdin closed, no more tag edits");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "stdin read failed, no more tag edits");
                    stdin_open = false;
                }
            },
            _ = cancel.cancelled() => break,
        }
    }

    info!("tagtime serve shutdown complete");
    Ok(())
}
