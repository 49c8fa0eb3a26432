//! SQLite snapshot repository.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text
//! (`2025-05-06T20:30:00.000000000Z`) so that string comparison in SQL orders
//! them chronologically.

use crate::error::StorageError;
use crate::models::{AudienceSnapshot, Item, ResourceId};
use crate::repository::SnapshotRepository;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::{debug, info, instrument};

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS resources (
        name TEXT PRIMARY KEY,
        added_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS audience_snapshots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        resource TEXT NOT NULL,
        active_users INTEGER NOT NULL,
        subscribers INTEGER NOT NULL,
        observed_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_audience_resource_time ON audience_snapshots(resource, observed_at)",
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        resource TEXT NOT NULL,
        item_id TEXT NOT NULL,
        title TEXT NOT NULL,
        internal_link TEXT NOT NULL,
        external_link TEXT NOT NULL,
        score INTEGER,
        comment_count INTEGER,
        author TEXT NOT NULL,
        rank INTEGER,
        observed_at TEXT NOT NULL,
        promoted INTEGER NOT NULL,
        pinned INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_items_resource_time ON items(resource, observed_at)",
];

/// Snapshot repository backed by a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect and create the schema if needed.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - in-memory database, gone when the pool closes
    /// - `sqlite:data/audiences.db?mode=rwc` - file database, created if missing
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqlitePoolOptions::new();
        // Every connection to `:memory:` opens its own database.
        let options = if database_url.contains(":memory:") {
            options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options.max_connections(5)
        };

        let pool = options.connect(database_url).await?;
        let repository = Self { pool };
        repository.run_migrations().await?;
        info!("Connected to snapshot database");
        Ok(repository)
    }

    /// Fresh in-memory database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, StorageError> {
        Self::connect("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(table: &'static str, value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptRow {
            table,
            reason: format!("bad timestamp {value:?}: {e}"),
        })
}

fn decode_resource(table: &'static str, value: &str) -> Result<ResourceId, StorageError> {
    ResourceId::parse(value).map_err(|e| StorageError::CorruptRow {
        table,
        reason: format!("bad resource {value:?}: {e}"),
    })
}

fn snapshot_from_row(row: &SqliteRow) -> Result<AudienceSnapshot, StorageError> {
    let resource: String = row.try_get("resource")?;
    let observed_at: String = row.try_get("observed_at")?;
    Ok(AudienceSnapshot {
        resource: decode_resource("audience_snapshots", &resource)?,
        active_users: row.try_get("active_users")?,
        subscribers: row.try_get("subscribers")?,
        observed_at: decode_time("audience_snapshots", &observed_at)?,
    })
}

#[async_trait]
impl SnapshotRepository for SqliteRepository {
    #[instrument(level = "debug", skip(self))]
    async fn find_due_resources(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<ResourceId>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT r.name AS name
            FROM resources r
            LEFT JOIN (
                SELECT resource, MAX(observed_at) AS last_observed
                FROM audience_snapshots
                GROUP BY resource
            ) a ON a.resource = r.name
            WHERE a.last_observed IS NULL OR a.last_observed < ?
            ORDER BY a.last_observed, r.name
            "#,
        )
        .bind(encode_time(threshold))
        .fetch_all(&self.pool)
        .await?;

        let due = rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("name")?;
                decode_resource("resources", &name)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = due.len(), "Found due resources");
        Ok(due)
    }

    async fn insert_audience_snapshot(
        &self,
        snapshot: &AudienceSnapshot,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO audience_snapshots (resource, active_users, subscribers, observed_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(snapshot.resource.as_str())
        .bind(snapshot.active_users)
        .bind(snapshot.subscribers)
        .bind(encode_time(snapshot.observed_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_item(&self, item: &Item) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO items
            (resource, item_id, title, internal_link, external_link, score, comment_count,
             author, rank, observed_at, promoted, pinned)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.resource.as_str())
        .bind(&item.item_id)
        .bind(&item.title)
        .bind(&item.internal_link)
        .bind(&item.external_link)
        .bind(item.score)
        .bind(item.comment_count)
        .bind(&item.author)
        .bind(item.rank)
        .bind(encode_time(item.observed_at))
        .bind(item.promoted)
        .bind(item.pinned)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn track_resource(&self, resource: &ResourceId) -> Result<bool, StorageError> {
        let result = sqlx::query("INSERT OR IGNORE INTO resources (name, added_at) VALUES (?, ?)")
            .bind(resource.as_str())
            .bind(encode_time(Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_audiences_between(
        &self,
        resource: &ResourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AudienceSnapshot>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT resource, active_users, subscribers, observed_at
            FROM audience_snapshots
            WHERE resource = ? AND observed_at >= ? AND observed_at <= ?
            ORDER BY observed_at
            "#,
        )
        .bind(resource.as_str())
        .bind(encode_time(start))
        .bind(encode_time(end))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snapshot_from_row).collect()
    }
}
