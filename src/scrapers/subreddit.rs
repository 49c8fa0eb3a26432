//! Subreddit listing page extractor.
//!
//! Reads the audience counters from the sidebar and every article row from
//! an old-style listing page (`https://www.reddit.com/r/<name>`).
//!
//! # Selectors
//!
//! | Value | Selector | On failure |
//! |-------|----------|------------|
//! | active users | `p.users-online span.number` | whole page rejected |
//! | subscribers | `span.subscribers span.number` | whole page rejected |
//! | article row | `.link` | - |
//! | title / external link | `p.title a.title` | `""` |
//! | discussion link / comment count | `a.comments` | `""` / `None` |
//! | score | `.score.unvoted` | `None` |
//! | rank | direct child `.rank` | `None` |
//!
//! A page whose counters can't be read is most likely not the page we
//! asked for (login wall, quarantine notice, truncated body), so nothing
//! from it is kept. Article fields on the other hand are read one by one and
//! a broken field never discards the row or its siblings.

use crate::error::ExtractionError;
use crate::models::{AudienceSnapshot, Item, ResourceId};
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::num::ParseIntError;
use tracing::{debug, info, instrument};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

static ACTIVE_USERS: Lazy<Selector> = Lazy::new(|| selector("p.users-online span.number"));
static SUBSCRIBERS: Lazy<Selector> = Lazy::new(|| selector("span.subscribers span.number"));
static LINK: Lazy<Selector> = Lazy::new(|| selector(".link"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("p.title a.title"));
static COMMENTS: Lazy<Selector> = Lazy::new(|| selector("a.comments"));
static SCORE: Lazy<Selector> = Lazy::new(|| selector(".score.unvoted"));

/// Type prefixes of reddit fullnames.
const KIND_PREFIXES: [&str; 4] = ["t0_", "t1_", "t2_", "t3_"];

/// Everything read from one listing page.
#[derive(Debug, Clone)]
pub struct Listing {
    pub snapshot: AudienceSnapshot,
    pub items: Vec<Item>,
}

/// Parse a counter as displayed by reddit.
///
/// Strips a `~` in first position (approximate values), every `,`
/// thousands separator and surrounding whitespace. A `~` after leading
/// whitespace is not stripped, so `" ~5"` is rejected.
///
/// ```ignore
/// assert_eq!(clean_int("~1,234 ").unwrap(), 1234);
/// ```
pub fn clean_int(value: &str) -> Result<i64, ParseIntError> {
    let value = value.strip_prefix('~').unwrap_or(value);
    value.replace(',', "").trim().parse::<i64>()
}

/// Remove the type prefix from a reddit fullname (`t3_abc123` -> `abc123`).
///
/// Ids without a known prefix are returned unchanged.
pub fn strip_kind_prefix(fullname: &str) -> &str {
    KIND_PREFIXES
        .iter()
        .find_map(|prefix| fullname.strip_prefix(prefix))
        .unwrap_or(fullname)
}

/// Extract the audience snapshot and the articles from a listing page.
///
/// Every record is stamped with `observed_at`.
///
/// # Errors
///
/// [`ExtractionError`] when the active users or the subscribers counter is
/// missing or not a number. Article problems never fail the extraction.
#[instrument(level = "debug", skip_all, fields(%resource, bytes = html.len()))]
pub fn extract_listing(
    resource: &ResourceId,
    html: &str,
    observed_at: DateTime<Utc>,
) -> Result<Listing, ExtractionError> {
    let document = Html::parse_document(html);

    let active_users = required_count(&document, &ACTIVE_USERS, resource, "audience")?;
    let subscribers = required_count(&document, &SUBSCRIBERS, resource, "subscribers")?;

    let items: Vec<Item> = document
        .select(&LINK)
        .map(|row| extract_item(row, resource, observed_at))
        .collect();

    info!(active_users, subscribers, items = items.len(), "Extracted listing");

    Ok(Listing {
        snapshot: AudienceSnapshot {
            resource: resource.clone(),
            active_users,
            subscribers,
            observed_at,
        },
        items,
    })
}

fn required_count(
    document: &Html,
    selector: &Selector,
    resource: &ResourceId,
    field: &'static str,
) -> Result<i64, ExtractionError> {
    let value = document
        .select(selector)
        .next()
        .map(|node| node.text().collect::<String>())
        .unwrap_or_default();

    if value.trim().is_empty() {
        return Err(ExtractionError::MissingField {
            resource: resource.to_string(),
            field,
        });
    }

    clean_int(&value).map_err(|source| ExtractionError::InvalidNumber {
        resource: resource.to_string(),
        field,
        value: truncate_for_log(value.trim(), 40),
        source,
    })
}

fn extract_item(row: ElementRef<'_>, resource: &ResourceId, observed_at: DateTime<Utc>) -> Item {
    let attr = |name: &str| row.value().attr(name).unwrap_or_default().to_string();

    let title = row.select(&TITLE).next();
    let comments = row.select(&COMMENTS).next();

    let fullname = attr("data-fullname");
    let item_id = strip_kind_prefix(&fullname).to_string();

    let rank = row
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| has_class(child, "rank"))
        .and_then(|node| optional_count(node, "rank", &item_id))
        .and_then(|rank| i32::try_from(rank).ok());

    let score = row
        .select(&SCORE)
        .next()
        .and_then(|node| optional_count(node, "score", &item_id));

    let comment_count = comments.and_then(|node| {
        let text = node.text().collect::<String>();
        parse_comment_count(&text)
    });

    Item {
        resource: resource.clone(),
        item_id,
        title: title
            .map(|node| node.text().collect::<String>())
            .unwrap_or_default(),
        internal_link: comments
            .and_then(|node| node.value().attr("href"))
            .unwrap_or_default()
            .to_string(),
        external_link: title
            .and_then(|node| node.value().attr("href"))
            .unwrap_or_default()
            .to_string(),
        score,
        comment_count,
        author: attr("data-author"),
        rank,
        observed_at,
        promoted: has_class(&row, "promoted"),
        pinned: has_class(&row, "stickied"),
    }
}

fn optional_count(node: ElementRef<'_>, field: &'static str, item_id: &str) -> Option<i64> {
    let text = node.text().collect::<String>();
    match clean_int(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            // Hidden scores render as a bullet, promoted rows have an empty rank.
            debug!(item_id, field, value = %truncate_for_log(text.trim(), 20), error = %e, "Unparseable article field");
            None
        }
    }
}

/// `"1,024 comments"` -> 1024. A bare `"comment"` link has no count.
fn parse_comment_count(text: &str) -> Option<i64> {
    let count = text.replace("comments", "").replace("comment", "");
    clean_int(&count).ok()
}

fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{LinkFixture, listing_page, sample_links};

    fn rust() -> ResourceId {
        ResourceId::parse("rust").unwrap()
    }

    fn now() -> DateTime<Utc> {
        "2025-05-06T20:30:00Z".parse().unwrap()
    }

    #[test]
    fn test_clean_int_accepts_displayed_counters() {
        assert_eq!(clean_int("~1,234 ").unwrap(), 1234);
        assert_eq!(clean_int("1,234").unwrap(), 1234);
        assert_eq!(clean_int("  42 ").unwrap(), 42);
        assert_eq!(clean_int("1,234,567").unwrap(), 1_234_567);
    }

    #[test]
    fn test_clean_int_rejects_garbage() {
        assert!(clean_int("abc").is_err());
        assert!(clean_int("").is_err());
        assert!(clean_int("~").is_err());
        assert!(clean_int("12.3k").is_err());
        assert!(clean_int("~~5").is_err());
        assert!(clean_int(" ~5").is_err());
    }

    #[test]
    fn test_strip_kind_prefix() {
        assert_eq!(strip_kind_prefix("t3_abc123"), "abc123");
        assert_eq!(strip_kind_prefix("t1_xyz"), "xyz");
        assert_eq!(strip_kind_prefix("abc123"), "abc123");
        assert_eq!(strip_kind_prefix("t5_2qh1i"), "t5_2qh1i");
        assert_eq!(strip_kind_prefix(""), "");
    }

    #[test]
    fn test_parse_comment_count() {
        assert_eq!(parse_comment_count("56 comments"), Some(56));
        assert_eq!(parse_comment_count(" 1,024 comments "), Some(1024));
        assert_eq!(parse_comment_count("1 comment"), Some(1));
        assert_eq!(parse_comment_count("comment"), None);
    }

    #[test]
    fn test_extract_listing_reads_counters_and_items() {
        let html = listing_page(Some("~1,234"), Some("250,123"), &sample_links());
        let listing = extract_listing(&rust(), &html, now()).unwrap();

        assert_eq!(listing.snapshot.resource, rust());
        assert_eq!(listing.snapshot.active_users, 1234);
        assert_eq!(listing.snapshot.subscribers, 250_123);
        assert_eq!(listing.snapshot.observed_at, now());
        assert_eq!(listing.items.len(), 3);

        let pinned = &listing.items[0];
        assert_eq!(pinned.item_id, "pin001");
        assert!(pinned.pinned);
        assert!(!pinned.promoted);
        assert_eq!(pinned.rank, None);

        let regular = &listing.items[1];
        assert_eq!(regular.item_id, "abc123");
        assert_eq!(regular.title, "Announcing Rust 1.0");
        assert_eq!(regular.author, "alice");
        assert_eq!(regular.rank, Some(1));
        assert_eq!(regular.score, Some(1234));
        assert_eq!(regular.comment_count, Some(56));
        assert_eq!(regular.external_link, "https://blog.rust-lang.org/1.0");
        assert_eq!(
            regular.internal_link,
            "https://www.reddit.com/r/rust/comments/abc123/"
        );
        assert_eq!(regular.observed_at, now());

        let promoted = &listing.items[2];
        assert!(promoted.promoted);
        assert_eq!(promoted.score, None);
    }

    #[test]
    fn test_missing_audience_rejects_page() {
        let html = listing_page(None, Some("250,123"), &sample_links());
        let err = extract_listing(&rust(), &html, now()).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::MissingField { field: "audience", .. }
        ));
    }

    #[test]
    fn test_unparseable_subscribers_rejects_page() {
        let html = listing_page(Some("12"), Some("lots"), &sample_links());
        let err = extract_listing(&rust(), &html, now()).unwrap_err();
        match err {
            ExtractionError::InvalidNumber { field, value, .. } => {
                assert_eq!(field, "subscribers");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_rank_only_affects_that_item() {
        let links = vec![
            LinkFixture {
                rank: None,
                ..LinkFixture::new("t3_norank", "bob", 7)
            },
            LinkFixture::new("t3_second", "carol", 2),
        ];
        let html = listing_page(Some("10"), Some("20"), &links);
        let listing = extract_listing(&rust(), &html, now()).unwrap();

        assert_eq!(listing.items.len(), 2);
        assert_eq!(listing.items[0].item_id, "norank");
        assert_eq!(listing.items[0].rank, None);
        assert_eq!(listing.items[0].score, Some(7));
        assert_eq!(listing.items[1].rank, Some(2));
        assert_eq!(listing.items[1].author, "carol");
    }

    #[test]
    fn test_bare_article_row_falls_back_field_by_field() {
        let html = r#"<html><body>
            <span class="subscribers"><span class="number">5</span></span>
            <p class="users-online"><span class="number">1</span></p>
            <div class="thing link"></div>
        </body></html>"#;
        let listing = extract_listing(&rust(), html, now()).unwrap();

        let item = &listing.items[0];
        assert_eq!(item.item_id, "");
        assert_eq!(item.title, "");
        assert_eq!(item.author, "");
        assert_eq!(item.internal_link, "");
        assert_eq!(item.rank, None);
        assert_eq!(item.score, None);
        assert_eq!(item.comment_count, None);
        assert!(!item.promoted && !item.pinned);
    }

    #[test]
    fn test_page_without_articles() {
        let html = listing_page(Some("3"), Some("4"), &[]);
        let listing = extract_listing(&rust(), &html, now()).unwrap();
        assert!(listing.items.is_empty());
    }
}
