//! Data models for tracked subreddits and what the crawler observes on them.
//!
//! - [`ResourceId`]: validated name of a crawlable subreddit
//! - [`AudienceSnapshot`]: one timestamped audience measurement
//! - [`Item`]: one ranked article seen in a listing at a point in time
//!
//! Snapshots and items are append-only: the crawler creates them, the
//! repository stores them, nothing here mutates them afterwards.

use crate::error::ResourceIdError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest accepted resource name.
pub const MAX_RESOURCE_LEN: usize = 64;

/// Name of a crawlable subreddit, e.g. `rust`.
///
/// Only ASCII alphanumerics and `_` are accepted, so the name is always safe
/// to append to the listing base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    pub fn parse(name: &str) -> Result<Self, ResourceIdError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ResourceIdError::Empty);
        }
        if name.len() > MAX_RESOURCE_LEN {
            return Err(ResourceIdError::TooLong {
                max: MAX_RESOURCE_LEN,
            });
        }
        if let Some(c) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
            return Err(ResourceIdError::InvalidChar(c));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ResourceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(value: ResourceId) -> Self {
        value.0
    }
}

/// Audience of a subreddit at one crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceSnapshot {
    pub resource: ResourceId,
    /// Users online when the page was fetched.
    pub active_users: i64,
    pub subscribers: i64,
    pub observed_at: DateTime<Utc>,
}

/// An article as listed on a subreddit page.
///
/// `rank`, `score` and `comment_count` are `None` when the page did not
/// carry a usable number for them. A missing rank usually means a promoted
/// or stickied article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub resource: ResourceId,
    /// Site id without its type prefix (`t3_abc123` becomes `abc123`).
    pub item_id: String,
    pub title: String,
    /// Link to the discussion page.
    pub internal_link: String,
    /// Link the title points to; equals the discussion link for self posts.
    pub external_link: String,
    pub score: Option<i64>,
    pub comment_count: Option<i64>,
    pub author: String,
    pub rank: Option<i32>,
    pub observed_at: DateTime<Utc>,
    pub promoted: bool,
    pub pinned: bool,
}
