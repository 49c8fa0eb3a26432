//! Test doubles and HTML fixtures shared by the unit tests.

use crate::error::FetchError;
use crate::models::ResourceId;
use crate::scrapers::fetcher::DocumentSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// One article row of a listing page.
#[derive(Debug, Clone)]
pub struct LinkFixture {
    pub fullname: String,
    pub author: String,
    pub title: String,
    pub href: String,
    /// `None` leaves the rank node out entirely.
    pub rank: Option<String>,
    pub score: Option<String>,
    pub comments: String,
    pub classes: String,
}

impl LinkFixture {
    /// A plain article whose rank and score are both `position`.
    pub fn new(fullname: &str, author: &str, position: i64) -> Self {
        Self {
            fullname: fullname.to_string(),
            author: author.to_string(),
            title: format!("Article {fullname}"),
            href: format!("https://example.com/{}", bare_id(fullname)),
            rank: Some(position.to_string()),
            score: Some(position.to_string()),
            comments: format!("{position} comments"),
            classes: String::new(),
        }
    }

    pub fn html(&self) -> String {
        let rank = self
            .rank
            .as_deref()
            .map(|r| format!(r#"<span class="rank">{r}</span>"#))
            .unwrap_or_default();
        let score = self
            .score
            .as_deref()
            .map(|s| {
                format!(
                    r#"<div class="midcol unvoted"><div class="score dislikes">&bull;</div><div class="score unvoted">{s}</div><div class="score likes">&bull;</div></div>"#
                )
            })
            .unwrap_or_default();
        format!(
            r#"<div class=" thing id-{fullname} {classes} link" data-fullname="{fullname}" data-author="{author}">
                {rank}{score}
                <div class="entry unvoted">
                    <p class="title"><a class="title may-blank" href="{href}">{title}</a></p>
                    <ul class="flat-list buttons"><li class="first"><a href="https://www.reddit.com/r/rust/comments/{id}/" class="bylink comments may-blank">{comments}</a></li></ul>
                </div>
            </div>"#,
            fullname = self.fullname,
            classes = self.classes,
            author = self.author,
            href = self.href,
            title = self.title,
            id = bare_id(&self.fullname),
            comments = self.comments,
        )
    }
}

fn bare_id(fullname: &str) -> &str {
    fullname.split_once('_').map(|(_, id)| id).unwrap_or(fullname)
}

/// A stickied post (empty rank), a regular post and a promoted post.
pub fn sample_links() -> Vec<LinkFixture> {
    vec![
        LinkFixture {
            rank: Some(String::new()),
            score: Some("512".to_string()),
            comments: "12 comments".to_string(),
            classes: "stickied".to_string(),
            ..LinkFixture::new("t3_pin001", "AutoModerator", 0)
        },
        LinkFixture {
            title: "Announcing Rust 1.0".to_string(),
            href: "https://blog.rust-lang.org/1.0".to_string(),
            score: Some("1,234".to_string()),
            comments: "56 comments".to_string(),
            ..LinkFixture::new("t3_abc123", "alice", 1)
        },
        LinkFixture {
            rank: None,
            score: Some("&bull;".to_string()),
            comments: "comment".to_string(),
            classes: "promoted".to_string(),
            ..LinkFixture::new("t3_ad42", "sponsor", 0)
        },
    ]
}

/// An old-style subreddit page; `None` leaves the counter node out.
pub fn listing_page(
    active_users: Option<&str>,
    subscribers: Option<&str>,
    links: &[LinkFixture],
) -> String {
    let subscribers = subscribers
        .map(|s| {
            format!(
                r#"<span class="subscribers"><span class="number">{s}</span>&nbsp;<span class="word">readers</span></span>"#
            )
        })
        .unwrap_or_default();
    let active_users = active_users
        .map(|a| {
            format!(
                r#"<p class="users-online" title="users here now"><span class="number">{a}</span>&nbsp;<span class="word">users here now</span></p>"#
            )
        })
        .unwrap_or_default();
    let rows = links.iter().map(LinkFixture::html).collect::<String>();

    format!(
        r#"<!doctype html>
<html>
<head><title>r/rust</title></head>
<body>
    <div class="side">{subscribers}{active_users}</div>
    <div id="siteTable" class="sitetable linklisting">{rows}</div>
</body>
</html>"#
    )
}

/// Serves canned pages and records the order resources were asked for.
#[derive(Default)]
pub struct StaticSource {
    pages: HashMap<String, String>,
    fetched: Mutex<Vec<ResourceId>>,
}

impl StaticSource {
    pub fn with_page(mut self, resource: &str, html: String) -> Self {
        self.pages.insert(resource.to_string(), html);
        self
    }

    pub fn fetched(&self) -> Vec<ResourceId> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    async fn fetch(&self, resource: &ResourceId) -> Result<String, FetchError> {
        self.fetched.lock().unwrap().push(resource.clone());
        self.pages
            .get(resource.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                resource: resource.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
    }
}
