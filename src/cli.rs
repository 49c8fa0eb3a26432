//! Command-line interface definitions for Reddit Audiences.
//!
//! Flags override the matching keys of the YAML configuration file; the
//! database URL can also come from the environment.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Reddit Audiences service.
///
/// # Examples
///
/// ```sh
/// # Crawl every tracked subreddit and serve the read API
/// reddit_audiences run
///
/// # Only serve the API, on another port
/// reddit_audiences run --no-crawl --listen 0.0.0.0:8080
///
/// # Start tracking two subreddits
/// reddit_audiences track rust golang
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// SQLite connection URL (overrides `database_url`)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the crawler and the read API until interrupted
    Run {
        /// Address for the read API (overrides `listen_addr`)
        #[arg(long)]
        listen: Option<String>,

        /// Serve the read API without crawling
        #[arg(long)]
        no_crawl: bool,
    },
    /// Add subreddits to the crawl list
    Track {
        /// Subreddit names, without the `r/` prefix
        #[arg(required = true)]
        names: Vec<String>,
    },
}
