// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification delivery to the log and the terminal.

use tagtime_core::{Notification, NotificationSink};
use tracing::{info, warn};

use crate::commands::format_time;

/// Logs every notification and echoes a readable line to stderr.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, notification: Notification) {
        let kind = notification.kind();
        match &notification {
            Notification::NewSample { sample_id, .. } => {
                info!(kind = %kind, sample_id = %sample_id, "notification");
            }
            Notification::ResubmitNeeded { sample_id, .. } => {
                warn!(kind = %kind, sample_id = %sample_id, "notification");
            }
            Notification::AuthError { goal_id, .. } | Notification::VersionError { goal_id, .. } => {
                warn!(kind = %kind, goal_id = %goal_id, "notification");
            }
        }
        eprintln!("{}", describe(&notification));
    }
}

/// Human-readable text for a notification.
pub fn describe(notification: &Notification) -> String {
    match notification {
        Notification::NewSample {
            sample_id,
            timestamp,
            suggested_tags,
        } => {
            let mut text = format!(
                "ping {sample_id} at {}: what are you doing? (tagtime tag {sample_id} <tags>)",
                format_time(*timestamp)
            );
            if !suggested_tags.is_empty() {
                text.push_str(&format!(" [recent: {}]", suggested_tags.join(" ")));
            }
            text
        }
        Notification::ResubmitNeeded { sample_id, reason } => format!(
            "sample {sample_id} could not be synced ({reason}); re-tag it to try again"
        ),
        Notification::AuthError { goal, message, .. } => format!(
            "Beeminder rejected the token for {goal} ({message}); run `tagtime goal link` again"
        ),
        Notification::VersionError { goal, message, .. } => {
            format!("Beeminder rejected this client for {goal} ({message}); upgrade tagtime")
        }
    }
}
