//! Fetching and reading subreddit listing pages.
//!
//! Crawling a subreddit happens in two phases:
//!
//! 1. **Fetching**: [`fetcher`] downloads the listing page as text
//! 2. **Extracting**: [`subreddit`] parses the page and reads the audience
//!    counters and the article rows out of it
//!
//! The two are kept apart because the parsed document is not `Send`: it is
//! built and dropped inside the synchronous extraction call and never lives
//! across an `.await`.

pub mod fetcher;
pub mod subreddit;
