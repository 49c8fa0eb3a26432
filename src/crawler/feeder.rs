//! Periodic producer of due subreddits.

use crate::error::ScheduleError;
use crate::models::ResourceId;
use crate::repository::SnapshotRepository;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Pushes every due subreddit into the handoff queue once per period.
///
/// A subreddit is due when its latest snapshot is older than the staleness
/// window. Sends block while the worker is busy, so the feeder never runs
/// more than the queue capacity ahead of it.
pub struct Feeder {
    repository: Arc<dyn SnapshotRepository>,
    queue: mpsc::Sender<ResourceId>,
    period: Duration,
    staleness: TimeDelta,
}

impl Feeder {
    pub fn new(
        repository: Arc<dyn SnapshotRepository>,
        queue: mpsc::Sender<ResourceId>,
        period: Duration,
        staleness: TimeDelta,
    ) -> Self {
        Self {
            repository,
            queue,
            period,
            staleness,
        }
    }

    /// Snapshots older than this are stale at `now`.
    ///
    /// A window reaching past the representable range clamps to the earliest
    /// date, so only never-crawled resources are due.
    pub fn due_threshold(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.staleness)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Feed on every tick until shutdown or until the worker is gone.
    ///
    /// The first tick fires immediately. Dropping `self` on return closes
    /// the queue, which lets the worker drain and exit.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(period = ?self.period, staleness = %self.staleness, "Starting crawling job");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            debug!("Crawling job is running");
            match self.feed_once(Utc::now(), &shutdown).await {
                Ok(queued) => debug!(queued, "Feeding pass done"),
                Err(e @ ScheduleError::Query(_)) => warn!(error = %e, "Skipping feeding pass"),
                Err(e) => {
                    info!(reason = %e, "Feeder stopping");
                    break;
                }
            }
        }
        info!("Crawling job stopped");
    }

    /// Queue every resource due at `now`, in repository order.
    ///
    /// Returns how many were handed to the worker.
    #[instrument(level = "debug", skip_all)]
    pub async fn feed_once(
        &self,
        now: DateTime<Utc>,
        shutdown: &CancellationToken,
    ) -> Result<usize, ScheduleError> {
        let due = self
            .repository
            .find_due_resources(self.due_threshold(now))
            .await?;

        let mut queued = 0;
        for resource in due {
            info!(%resource, "Queueing for crawl");
            tokio::select! {
                _ = shutdown.cancelled() => return Err(ScheduleError::Cancelled),
                sent = self.queue.send(resource) => {
                    sent.map_err(|_| ScheduleError::QueueClosed)?;
                }
            }
            queued += 1;
        }
        Ok(queued)
    }
}
