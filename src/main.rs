//! # Reddit Audiences
//!
//! A long-running crawler that records how many people are reading each
//! tracked subreddit, together with the posts on its front listing, and
//! serves the day's audience curve over HTTP.
//!
//! ## Features
//!
//! - Re-crawls every tracked subreddit once its latest snapshot is older
//!   than the staleness window (5 minutes by default)
//! - Fetches one listing at a time with a jittered pause between requests
//! - Stores audience snapshots and listing items in SQLite
//! - Serves `GET /api/today/{subreddit}` as JSON
//!
//! ## Usage
//!
//! ```sh
//! reddit_audiences track rust golang
//! reddit_audiences run
//! ```
//!
//! ## Architecture
//!
//! 1. **Feeding**: every 30s, look up stale subreddits and queue them
//! 2. **Fetching**: download the listing page of the next queued subreddit
//! 3. **Extraction**: pull the audience counts and items out of the HTML
//! 4. **Storage**: persist one snapshot and the items, then pause 1-2s

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod crawler;
mod error;
mod models;
mod repository;
mod scrapers;
#[cfg(test)]
mod testing;
mod utils;

use cli::{Cli, Command};
use config::Config;
use models::ResourceId;
use repository::{SnapshotRepository, SqliteRepository};
use scrapers::fetcher::HttpFetcher;
use utils::ensure_database_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref()).await?;
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    if let Err(e) = ensure_database_dir(&config.database_url).await {
        error!(
            database_url = %config.database_url,
            error = %e,
            "Database directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }
    let repository = Arc::new(SqliteRepository::connect(&config.database_url).await?);

    match args.command {
        Command::Track { names } => track(repository, &names).await,
        Command::Run { listen, no_crawl } => {
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            if no_crawl {
                config.crawl = false;
            }
            run(config, repository).await
        }
    }
}

/// Register subreddits; names that are already tracked are left alone.
#[instrument(level = "info", skip_all)]
async fn track(
    repository: Arc<SqliteRepository>,
    names: &[String],
) -> Result<(), Box<dyn Error>> {
    for name in names {
        let resource = ResourceId::parse(name).map_err(|e| format!("{name:?}: {e}"))?;
        if repository.track_resource(&resource).await? {
            info!(%resource, "Now tracking");
        } else {
            info!(%resource, "Already tracked");
        }
    }
    Ok(())
}

/// Serve the read API, and crawl unless disabled, until Ctrl-C.
async fn run(config: Config, repository: Arc<SqliteRepository>) -> Result<(), Box<dyn Error>> {
    let started_at = Utc::now();
    let shutdown = CancellationToken::new();

    let crawler = if config.crawl {
        let fetcher = HttpFetcher::new(
            config.base_url()?,
            &config.user_agent,
            config.request_timeout(),
        )?;
        Some(crawler::spawn(
            &config,
            Arc::new(fetcher),
            repository.clone(),
            shutdown.clone(),
        ))
    } else {
        warn!("Crawling disabled; serving stored data only");
        None
    };

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Read API listening");

    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received; shutting down"),
            Err(e) => error!(error = %e, "Cannot listen for Ctrl-C; shutting down"),
        }
        interrupt.cancel();
    });

    let served = axum::serve(listener, api::router(repository))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await;
    // Stop the crawler too if the server ended on its own.
    shutdown.cancel();

    if let Some(crawler) = crawler {
        crawler.join().await;
    }

    let uptime = Utc::now() - started_at;
    info!(uptime = %uptime, "Execution complete");
    served?;
    Ok(())
}
