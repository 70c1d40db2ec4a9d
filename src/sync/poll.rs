use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::domain::message::{GroupId, Message};

use super::contracts::SnapshotSource;

const POLL_FETCH_FAILED: &str = "SYNC_POLL_FETCH_FAILED";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);

/// Periodic full-timeline refresh used while the live channel is unusable.
///
/// At most one interval task exists; `start` while running and `stop` while
/// stopped are both no-ops.
#[derive(Debug, Default)]
pub struct PollFallbackScheduler {
    task: Option<JoinHandle<()>>,
}

impl PollFallbackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts polling `source` every `interval`, handing each snapshot to
    /// `on_snapshot`. The first fetch happens one interval after start.
    /// Returns false when a poll loop was already running.
    pub fn start<F>(
        &mut self,
        source: Arc<dyn SnapshotSource>,
        group_id: GroupId,
        interval: Duration,
        on_snapshot: F,
    ) -> bool
    where
        F: Fn(Vec<Message>) + Send + 'static,
    {
        if self.is_running() {
            return false;
        }

        tracing::debug!(
            group_id = %group_id,
            interval_ms = interval.as_millis() as u64,
            "poll fallback started"
        );
        let first_tick = Instant::now() + interval;
        self.task = Some(tokio::spawn(run_poll_loop(
            source,
            group_id,
            first_tick,
            interval,
            on_snapshot,
        )));
        true
    }

    /// Cancels the interval. Returns false when nothing was running.
    pub fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                tracing::debug!("poll fallback stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for PollFallbackScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_poll_loop<F>(
    source: Arc<dyn SnapshotSource>,
    group_id: GroupId,
    first_tick: Instant,
    interval: Duration,
    on_snapshot: F,
) where
    F: Fn(Vec<Message>),
{
    let mut ticker = time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match source.fetch_messages(group_id).await {
            Ok(messages) => {
                tracing::trace!(
                    group_id = %group_id,
                    count = messages.len(),
                    "poll fallback fetched snapshot"
                );
                on_snapshot(messages);
            }
            Err(error) => {
                tracing::warn!(
                    code = POLL_FETCH_FAILED,
                    group_id = %group_id,
                    error = %error,
                    "poll fetch failed; retrying on next tick"
                );
            }
        }
    }
}
