//! Typed errors for the crawler, the repository and start-up.
//!
//! Every error that can happen inside a crawl cycle is handled where it
//! occurs (logged, then the cycle moves on). These types exist so the log
//! lines and the tests can tell the failure classes apart.

use std::num::ParseIntError;
use thiserror::Error;

/// Failure to retrieve a listing document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connect, timeout or body read failure.
    #[error("while crawling {resource}: {source}")]
    Transport {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("while crawling {resource}: unexpected status {status}")]
    Status {
        resource: String,
        status: reqwest::StatusCode,
    },

    /// The resource could not be turned into a URL under the base URL.
    #[error("invalid URL for {resource}: {source}")]
    InvalidUrl {
        resource: String,
        #[source]
        source: url::ParseError,
    },
}

/// A required field of the listing document is missing or unusable.
///
/// Raised only for the audience and subscriber counts; item fields fall back
/// to `None` instead.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("can't retrieve {resource} {field}: no text value in the dom node")]
    MissingField {
        resource: String,
        field: &'static str,
    },

    #[error("can't parse {resource} {field} from {value:?}: {source}")]
    InvalidNumber {
        resource: String,
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Snapshot repository failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row no longer decodes into the model.
    #[error("corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },
}

/// Why a feeding pass ended early.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("can't retrieve resources to crawl: {0}")]
    Query(#[from] StorageError),

    #[error("handoff queue closed")]
    QueueClosed,

    #[error("shutdown requested")]
    Cancelled,
}

/// Rejected resource name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("resource name is empty")]
    Empty,

    #[error("resource name is longer than {max} characters")]
    TooLong { max: usize },

    #[error("resource name contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
