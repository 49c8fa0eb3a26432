//! Crawl scheduling.
//!
//! Two tasks joined by a handoff queue:
//!
//! ```text
//! Feeder (every 30s: due list) --mpsc(1)--> Worker (fetch, extract, store, sleep 1-2s)
//! ```
//!
//! The worker is the only consumer, so subreddits are crawled strictly one
//! at a time and never twice concurrently. Its jittered pause is the only
//! rate limit; the feeder simply blocks on the queue while the worker is busy.
//!
//! Shutdown: cancelling the token stops the feeder, which closes the queue;
//! the worker finishes what is queued and exits.

pub mod feeder;
pub mod throttle;
pub mod worker;

use crate::config::Config;
use crate::repository::SnapshotRepository;
use crate::scrapers::fetcher::DocumentSource;
use feeder::Feeder;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;
use worker::Worker;

/// Capacity of the handoff queue between feeder and worker.
pub const HANDOFF_CAPACITY: usize = 1;

/// The running feeder and worker tasks.
pub struct CrawlerHandle {
    feeder: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl CrawlerHandle {
    /// Wait for both tasks, typically after cancelling the shutdown token.
    pub async fn join(self) {
        if let Err(e) = self.feeder.await {
            error!(error = %e, "Feeder task failed");
        }
        if let Err(e) = self.worker.await {
            error!(error = %e, "Worker task failed");
        }
    }
}

/// Start the feeder and the worker on the current runtime.
pub fn spawn(
    config: &Config,
    source: Arc<dyn DocumentSource>,
    repository: Arc<dyn SnapshotRepository>,
    shutdown: CancellationToken,
) -> CrawlerHandle {
    let (queue, receiver) = mpsc::channel(HANDOFF_CAPACITY);

    let worker = Worker::new(source, repository.clone(), config.throttle());
    let feeder = Feeder::new(
        repository,
        queue,
        config.feed_period(),
        config.staleness(),
    );

    CrawlerHandle {
        worker: tokio::spawn(worker.run(receiver)),
        feeder: tokio::spawn(feeder.run(shutdown)),
    }
}
