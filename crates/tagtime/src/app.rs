// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Component wiring shared by every subcommand.

use std::sync::Arc;

use tagtime_beeminder::{BeeminderClient, BeeminderConnector};
use tagtime_config::model::TagTimeConfig;
use tagtime_core::{Clock, NotificationSink, SessionConnector, SystemClock, TagTimeError};
use tagtime_schedule::{AlarmTimer, SchedulerService};
use tagtime_storage::SqliteStore;
use tagtime_sync::SyncQueue;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::notify::LogNotifier;

pub struct App {
    pub config: TagTimeConfig,
    pub store: Arc<SqliteStore>,
    pub clock: Arc<dyn Clock>,
    pub timer: Arc<AlarmTimer>,
    pub scheduler: SchedulerService,
    pub queue: SyncQueue,
}

impl App {
    /// Opens the configured database and wires the Beeminder session.
    pub async fn open(config: TagTimeConfig, cancel: CancellationToken) -> Result<Self, TagTimeError> {
        let store = SqliteStore::new(config.storage.clone());
        store.initialize().await?;
        let connector = Arc::new(BeeminderConnector::new(BeeminderClient::new(
            &config.beeminder,
        )?));
        Ok(Self::with_parts(
            config,
            Arc::new(store),
            Arc::new(SystemClock),
            Arc::new(LogNotifier),
            connector,
            cancel,
        ))
    }

    pub fn with_parts(
        config: TagTimeConfig,
        store: Arc<SqliteStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
        connector: Arc<dyn SessionConnector>,
        cancel: CancellationToken,
    ) -> Self {
        let timer = Arc::new(AlarmTimer::new(Arc::clone(&clock)));
        let scheduler = SchedulerService::new(
            config.schedule.clone(),
            store.clone(),
            store.clone(),
            Arc::clone(&notifier),
            timer.clone(),
            Arc::clone(&clock),
        );
        let queue = tagtime_sync::build_queue(
            &config.sync,
            store.clone(),
            store.clone(),
            notifier,
            connector,
            cancel,
        );
        debug!(database = %config.storage.database_path, "components wired");
        Self {
            config,
            store,
            clock,
            timer,
            scheduler,
            queue,
        }
    }

    pub async fn close(&self) -> Result<(), TagTimeError> {
        self.queue.shutdown().await;
        self.store.close().await
    }
}
