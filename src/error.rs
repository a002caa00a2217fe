//! Crate-wide error type.
//!
//! A `thiserror`-derived enum with one variant per error code, plus
//! transparent conversions from the I/O primitives agents and the cache
//! layer call into. `EolError` only
//! crosses function boundaries *within* a module — it never crosses the
//! agent/orchestrator contract, which always deals in `EolEnvelope`.

use crate::domain_types::ErrorCode;
use thiserror::Error;

/// Main error type for EOL Sentinel operations.
#[derive(Error, Debug)]
pub enum EolError {
    /// Exhausted all candidate agents with no positive result.
    #[error("no EOL data found for {software} {version}")]
    NoDataFound {
        /// Software name queried.
        software: String,
        /// Version queried, or `"any"`.
        version: String,
    },

    /// The fallback agent detected a persistent challenge page.
    #[error("search blocked by anti-bot challenge: {0}")]
    CloudflareBlocked(String),

    /// The fallback agent scraped a page but found no usable date.
    #[error("no EOL date could be extracted from scraped content")]
    NoEolDateFound,

    /// A specific agent raised an internal exception.
    #[error("agent {agent} failed: {message}")]
    AgentException {
        /// Name of the failing agent.
        agent: String,
        /// Exception message.
        message: String,
    },

    /// The persistent cache store is offline; degraded to memory-only.
    #[error("persistent cache unavailable: {0}")]
    CacheUnavailable(String),

    /// A specific upstream returned non-2xx or failed to parse.
    #[error("scrape failed for {url}: {message}")]
    ScrapeFailed {
        /// URL that failed.
        url: String,
        /// Reason for the failure.
        message: String,
    },

    /// Error from the persistent cache store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error performing an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error (de)serializing JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error parsing or formatting a date.
    #[error("date parse error: {0}")]
    DateParse(String),

    /// IO error, e.g. creating the database's parent directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EolError {
    /// The machine-readable error code this error maps to
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NoDataFound { .. } => ErrorCode::NoDataFound,
            Self::CloudflareBlocked(_) => ErrorCode::CloudflareBlocked,
            Self::NoEolDateFound => ErrorCode::NoEolDateFound,
            Self::AgentException { .. } => ErrorCode::AgentException,
            Self::CacheUnavailable(_) => ErrorCode::CacheUnavailable,
            Self::ScrapeFailed { .. } => ErrorCode::ScrapeFailed,
            Self::Database(_) => ErrorCode::CacheUnavailable,
            Self::Http(_) | Self::DateParse(_) => ErrorCode::ScrapeFailed,
            Self::Serialization(_) | Self::Io(_) => ErrorCode::AgentException,
        }
    }
}

/// Convenience result alias used throughout the crate.
pub type EolResult<T> = Result<T, EolError>;
