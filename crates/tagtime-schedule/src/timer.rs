// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process wake-up alarm backed by a tokio timer.

use std::sync::Arc;
use std::time::Duration;

use tagtime_core::{Clock, WakeAlarm};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// [`WakeAlarm`] that a daemon loop waits on with [`AlarmTimer::wait`].
pub struct AlarmTimer {
    armed: watch::Sender<Option<i64>>,
    clock: Arc<dyn Clock>,
}

impl AlarmTimer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (armed, _) = watch::channel(None);
        Self { armed, clock }
    }

    /// The currently armed time, if any.
    pub fn armed_at(&self) -> Option<i64> {
        *self.armed.borrow()
    }

    /// Waits until the armed time is reached. Re-arming while waiting moves
    /// the deadline. Returns `false` if cancelled first.
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        let mut rx = self.armed.subscribe();
        loop {
            let armed = *rx.borrow_and_update();
            let sleep_for = match armed {
                Some(at) => {
                    let remaining = at - self.clock.now();
                    if remaining <= 0 {
                        debug!(at, "wake-up alarm fired");
                        return true;
                    }
                    Duration::from_secs(remaining.unsigned_abs())
                }
                // Nothing armed: wait for a change only.
                None => Duration::MAX,
            };

            tokio::select! {
                _ = cancel.cancelled() => return false,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
                _ = tokio::time::sleep(sleep_for), if armed.is_some() => {}
            }
        }
    }
}

impl WakeAlarm for AlarmTimer {
    fn arm(&self, at: i64) {
        self.armed.send_replace(Some(at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagtime_test_utils::ManualClock;

    #[tokio::test(start_paused = true)]
    async fn fires_once_clock_reaches_armed_time() {
        let clock = Arc::new(ManualClock::new(1_000));
        let timer = Arc::new(AlarmTimer::new(clock.clone()));
        timer.arm(1_000);
        let cancel = CancellationToken::new();
        assert!(timer.wait(&cancel).await);
        assert_eq!(timer.armed_at(), Some(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_wait() {
        let clock = Arc::new(ManualClock::new(1_000));
        let timer = AlarmTimer::new(clock);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!timer.wait(&cancel).await);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_wakes_the_waiter() {
        let clock = Arc::new(ManualClock::new(1_000));
        let timer = Arc::new(AlarmTimer::new(clock.clone()));
        timer.arm(5_000);
        let cancel = CancellationToken::new();

        let waiter = {
            let timer = timer.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { timer.wait(&cancel).await })
        };
        tokio::task::yield_now().await;
        clock.set(2_000);
        timer.arm(1_500);
        assert!(waiter.await.unwrap());
    }
}
