//! Runtime configuration.
//!
//! Values come from an optional YAML file (see `--config`), every key
//! falling back to its default, and a few of them can then be overridden
//! from the command line.
//!
//! ```yaml
//! database_url: "sqlite:/var/lib/reddit_audiences/audiences.db?mode=rwc"
//! listen_addr: "0.0.0.0:9000"
//! staleness_secs: 600
//! ```

use crate::crawler::throttle::Throttle;
use crate::error::ConfigError;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use url::Url;

/// Longest accepted staleness window (one year).
pub const MAX_STALENESS_SECS: u64 = 365 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// sqlx SQLite connection URL.
    pub database_url: String,
    /// Address the read API listens on.
    pub listen_addr: String,
    /// Run the crawler; when `false` only the read API is served.
    pub crawl: bool,
    /// Listing pages are fetched from `<base_url><subreddit>`.
    pub base_url: String,
    pub user_agent: String,
    /// How often due subreddits are looked up.
    pub feed_period_secs: u64,
    /// Minimum age of the latest snapshot before a subreddit is crawled again.
    pub staleness_secs: u64,
    pub request_timeout_secs: u64,
    /// Bounds of the random pause after each crawl.
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/audiences.db?mode=rwc".to_string(),
            listen_addr: "127.0.0.1:9000".to_string(),
            crawl: true,
            base_url: "https://www.reddit.com/r/".to_string(),
            user_agent: format!("reddit_audiences/{}", env!("CARGO_PKG_VERSION")),
            feed_period_secs: 30,
            staleness_secs: 300,
            request_timeout_secs: 10,
            min_delay_ms: 1000,
            max_delay_ms: 2000,
        }
    }
}

impl Config {
    /// Load from `path`, or use the defaults when no file is given.
    pub async fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Io {
                        path: path.to_string(),
                        source,
                    })?;
                info!(path, "Loaded configuration file");
                Self::from_yaml(&raw)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed_period_secs == 0 {
            return Err(ConfigError::Invalid("feed_period_secs must be > 0".into()));
        }
        if self.staleness_secs == 0 {
            return Err(ConfigError::Invalid("staleness_secs must be > 0".into()));
        }
        if self.staleness_secs > MAX_STALENESS_SECS {
            return Err(ConfigError::Invalid(format!(
                "staleness_secs must be at most {MAX_STALENESS_SECS}"
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "min_delay_ms ({}) is greater than max_delay_ms ({})",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        self.base_url()?;
        Ok(())
    }

    /// The listing base URL, with a trailing `/` so subreddit names append.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .map_err(|e| ConfigError::Invalid(format!("base_url {:?}: {e}", self.base_url)))
    }

    pub fn feed_period(&self) -> Duration {
        Duration::from_secs(self.feed_period_secs)
    }

    /// Saturates at [`TimeDelta::MAX`] instead of overflowing.
    pub fn staleness(&self) -> TimeDelta {
        i64::try_from(self.staleness_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn throttle(&self) -> Throttle {
        Throttle::new(
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}
