//! Error types shared by the scrape jobs and the store adapter.
//!
//! Job-local failures (network, parse, data) are absorbed by the executor
//! and only logged. Orchestrator-level failures and persistence failures
//! surface to the caller.

use thiserror::Error;

/// Coarse classification of a failure, used for logging and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote host unreachable, timed out, or answered with an error status.
    Network,
    /// An expected structural element is missing or malformed.
    Parse,
    /// An extracted value violates a format invariant (e.g. no guid).
    Data,
    /// Store write or transaction failure.
    Persistence,
    /// Invalid configuration or unresolvable input.
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Parse => write!(f, "parse"),
            Self::Data => write!(f, "data"),
            Self::Persistence => write!(f, "persistence"),
            Self::Config => write!(f, "config"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("data error: {0}")]
    Data(String),

    #[error("unknown term: {0}")]
    UnknownTerm(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::HttpStatus { .. } => ErrorKind::Network,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Data(_) => ErrorKind::Data,
            Self::UnknownTerm(_) | Self::Config(_) => ErrorKind::Config,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

/// Failures of the merge-upsert store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("event {0} already exists")]
    AlreadyExists(String),

    #[error("event record has an empty internal id")]
    MissingId,

    #[error("failed to prepare store location: {0}")]
    Io(#[from] std::io::Error),
}
