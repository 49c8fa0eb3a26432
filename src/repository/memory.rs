//! In-memory repository for tests, with switches to inject storage failures.

use crate::error::StorageError;
use crate::models::{AudienceSnapshot, Item, ResourceId};
use crate::repository::SnapshotRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct MemoryRepository {
    resources: Mutex<Vec<ResourceId>>,
    snapshots: Mutex<Vec<AudienceSnapshot>>,
    items: Mutex<Vec<Item>>,
    fail_reads: AtomicBool,
    fail_snapshots: AtomicBool,
    failing_items: Mutex<HashSet<String>>,
}

fn injected(what: &str) -> StorageError {
    StorageError::Database(sqlx::Error::Protocol(format!("injected {what} failure")))
}

impl MemoryRepository {
    pub fn with_resources(names: &[&str]) -> Self {
        let repository = Self::default();
        *repository.resources.lock().unwrap() = names
            .iter()
            .map(|name| ResourceId::parse(name).unwrap())
            .collect();
        repository
    }

    /// Make the due-list and audience queries fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_snapshots(&self, fail: bool) {
        self.fail_snapshots.store(fail, Ordering::SeqCst);
    }

    /// Make inserts of the item with this (stripped) id fail.
    pub fn fail_item(&self, item_id: &str) {
        self.failing_items.lock().unwrap().insert(item_id.to_string());
    }

    pub fn snapshots(&self) -> Vec<AudienceSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn items(&self) -> Vec<Item> {
        self.items.lock().unwrap().clone()
    }

    fn last_observed(&self, resource: &ResourceId) -> Option<DateTime<Utc>> {
        self.snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| &s.resource == resource)
            .map(|s| s.observed_at)
            .max()
    }
}

#[async_trait]
impl SnapshotRepository for MemoryRepository {
    async fn find_due_resources(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<ResourceId>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("due query"));
        }
        let resources = self.resources.lock().unwrap().clone();
        let mut due: Vec<(Option<DateTime<Utc>>, ResourceId)> = resources
            .into_iter()
            .map(|r| (self.last_observed(&r), r))
            .filter(|(last, _)| last.is_none_or(|t| t < threshold))
            .collect();
        due.sort();
        Ok(due.into_iter().map(|(_, r)| r).collect())
    }

    async fn insert_audience_snapshot(
        &self,
        snapshot: &AudienceSnapshot,
    ) -> Result<(), StorageError> {
        if self.fail_snapshots.load(Ordering::SeqCst) {
            return Err(injected("snapshot insert"));
        }
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn insert_item(&self, item: &Item) -> Result<i64, StorageError> {
        if self.failing_items.lock().unwrap().contains(&item.item_id) {
            return Err(injected("item insert"));
        }
        let mut items = self.items.lock().unwrap();
        items.push(item.clone());
        Ok(items.len() as i64)
    }

    async fn track_resource(&self, resource: &ResourceId) -> Result<bool, StorageError> {
        let mut resources = self.resources.lock().unwrap();
        if resources.contains(resource) {
            return Ok(false);
        }
        resources.push(resource.clone());
        Ok(true)
    }

    async fn find_audiences_between(
        &self,
        resource: &ResourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AudienceSnapshot>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("audience query"));
        }
        let mut found: Vec<AudienceSnapshot> = self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| &s.resource == resource && s.observed_at >= start && s.observed_at <= end)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.observed_at);
        Ok(found)
    }
}
