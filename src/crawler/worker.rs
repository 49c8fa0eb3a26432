//! The single consumer of the handoff queue.
//!
//! For each subreddit the worker fetches the listing page, extracts the
//! audience snapshot and the articles, stores them, then pauses before
//! taking the next one. Every failure is logged and the worker moves on;
//! only the closing of the queue stops it.

use crate::crawler::throttle::Throttle;
use crate::models::ResourceId;
use crate::repository::SnapshotRepository;
use crate::scrapers::fetcher::DocumentSource;
use crate::scrapers::subreddit::extract_listing;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// What happened to one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The page was read; the counts say how storing went.
    Stored {
        snapshot_stored: bool,
        items_stored: usize,
        items_failed: usize,
    },
    FetchFailed,
    /// The audience or subscriber counter was unusable; nothing was stored.
    ExtractionFailed,
}

pub struct Worker {
    source: Arc<dyn DocumentSource>,
    repository: Arc<dyn SnapshotRepository>,
    throttle: Throttle,
}

impl Worker {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        repository: Arc<dyn SnapshotRepository>,
        throttle: Throttle,
    ) -> Self {
        Self {
            source,
            repository,
            throttle,
        }
    }

    /// Consume the queue until every sender is gone and it is drained.
    pub async fn run(self, mut queue: mpsc::Receiver<ResourceId>) {
        info!("Crawl worker started");
        while let Some(resource) = queue.recv().await {
            let outcome = self.process(&resource).await;
            debug!(%resource, ?outcome, "Crawl cycle finished");

            let delay = self.throttle.next_delay();
            sleep(delay).await;
        }
        info!("Handoff queue closed; crawl worker exiting");
    }

    /// Fetch, extract and store one resource.
    #[instrument(level = "info", skip_all, fields(%resource))]
    pub async fn process(&self, resource: &ResourceId) -> CycleOutcome {
        let html = match self.source.fetch(resource).await {
            Ok(html) => html,
            Err(e) => {
                error!(error = %e, "Fetch failed");
                return CycleOutcome::FetchFailed;
            }
        };

        // One timestamp for everything this cycle stores.
        let observed_at = Utc::now();
        let listing = match extract_listing(resource, &html, observed_at) {
            Ok(listing) => listing,
            Err(e) => {
                error!(error = %e, "Listing page rejected");
                return CycleOutcome::ExtractionFailed;
            }
        };

        let snapshot = &listing.snapshot;
        let snapshot_stored = match self.repository.insert_audience_snapshot(snapshot).await {
            Ok(()) => {
                info!(
                    active_users = snapshot.active_users,
                    subscribers = snapshot.subscribers,
                    "Stored audience snapshot"
                );
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to store audience snapshot");
                false
            }
        };

        let mut items_stored = 0;
        let mut items_failed = 0;
        for item in &listing.items {
            match self.repository.insert_item(item).await {
                Ok(_) => items_stored += 1,
                Err(e) => {
                    items_failed += 1;
                    warn!(item_id = %item.item_id, error = %e, "Failed to store article");
                }
            }
        }
        info!(items_stored, items_failed, "Stored articles");

        CycleOutcome::Stored {
            snapshot_stored,
            items_stored,
            items_failed,
        }
    }
}
