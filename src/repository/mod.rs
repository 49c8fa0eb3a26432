//! Snapshot persistence.
//!
//! The crawler only needs a narrow slice of the database, captured by
//! [`SnapshotRepository`]:
//! - which tracked subreddits are due for a new crawl
//! - appending one audience snapshot
//! - appending one article observation
//!
//! The read API and the CLI use the remaining two methods. Nothing is ever
//! de-duplicated: crawling the same subreddit twice stores two snapshots.

use crate::error::StorageError;
use crate::models::{AudienceSnapshot, Item, ResourceId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
pub mod memory;
pub mod sqlite;

pub use sqlite::SqliteRepository;

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Tracked resources whose latest snapshot is older than `threshold`,
    /// or that have never been crawled.
    ///
    /// Never-crawled resources come first, then the stalest.
    async fn find_due_resources(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<ResourceId>, StorageError>;

    async fn insert_audience_snapshot(
        &self,
        snapshot: &AudienceSnapshot,
    ) -> Result<(), StorageError>;

    /// Store one article observation and return its row id.
    async fn insert_item(&self, item: &Item) -> Result<i64, StorageError>;

    /// Start tracking `resource`. Returns `false` if it was already tracked.
    async fn track_resource(&self, resource: &ResourceId) -> Result<bool, StorageError>;

    /// Snapshots of `resource` observed in `[start, end]`, oldest first.
    async fn find_audiences_between(
        &self,
        resource: &ResourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AudienceSnapshot>, StorageError>;
}
