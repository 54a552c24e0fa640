// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User notification sink.

use crate::types::Notification;

/// Delivers notifications to the user. Fire-and-forget: delivery failures are
/// the sink's own concern.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}
