//! Domain primitives for the EOL intelligence core.
//!
//! Validated `nutype`-derived newtypes: invalid values are rejected at the boundary rather than
//! carried as bare `String`/`f64` through the rest of the crate.

use chrono::{DateTime, Utc};
use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default connection pool size for the persistent cache tier.
pub const DEFAULT_CONNECTION_POOL_SIZE: usize = 10;

#[nutype(
    validate(greater = 0, less_or_equal = 100),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize),
    default = 10
)]
pub struct ConnectionPoolSize(usize);

impl ConnectionPoolSize {
    /// Number of connections as a plain `usize`.
    #[must_use]
    pub fn as_usize(&self) -> usize {
        self.into_inner()
    }
}

/// A software product name, case-insensitively matched throughout the crate.
///
/// Never empty after trimming; the orchestrator always lower-cases the
/// inner value before using it as a routing or cache key.
#[nutype(
    sanitize(trim),
    validate(not_empty),
    derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, AsRef)
)]
pub struct SoftwareName(String);

impl SoftwareName {
    /// Lower-cased form used for keyword matching and cache keys.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.as_ref().to_lowercase()
    }
}

/// An optional version string, dotted (`"20.04"`) or year form (`"2024"`).
#[nutype(
    sanitize(trim),
    validate(not_empty),
    derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, AsRef)
)]
pub struct SoftwareVersion(String);

impl SoftwareVersion {
    /// The `major.minor` (or bare major) slice used by static-table matching.
    #[must_use]
    pub fn major_minor(&self) -> String {
        let parts: Vec<&str> = self.as_ref().split('.').collect();
        match parts.len() {
            0 => String::new(),
            1 => parts[0].to_string(),
            _ => format!("{}.{}", parts[0], parts[1]),
        }
    }

    /// The major-version-only slice.
    #[must_use]
    pub fn major(&self) -> &str {
        self.as_ref().split('.').next().unwrap_or_default()
    }
}

/// The literal `"any"` sentinel used when deriving a cache key for a
/// version-less lookup.
#[must_use]
pub fn version_or_any(version: Option<&SoftwareVersion>) -> String {
    version.map_or_else(|| "any".to_string(), |v| v.as_ref().to_lowercase())
}

/// A confidence score in `[0, 1]`.
#[nutype(
    validate(greater_or_equal = 0.0, less_or_equal = 1.0),
    derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)
)]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    /// The zero confidence score, used as the starting point of orchestrator scoring.
    #[must_use]
    pub fn zero() -> Self {
        Self::try_new(0.0).unwrap_or_default()
    }

    /// Clamp an arbitrary float into a valid confidence score.
    #[must_use]
    pub fn clamp(value: f64) -> Self {
        Self::try_new(value.clamp(0.0, 1.0)).unwrap_or_default()
    }

    /// Confidence as a plain `f64`.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.into_inner()
    }
}

impl Default for ConfidenceScore {
    fn default() -> Self {
        Self::try_new(0.0).expect("0.0 is a valid confidence score")
    }
}

/// How an envelope's data was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Served from the in-source static lookup table.
    Static,
    /// Parsed from a live HTML scrape.
    Scraped,
    /// Served from the two-tier cache or the orchestrator session cache.
    Cache,
    /// Completed or corrected by the optional LLM-assisted extraction path.
    LlmAssisted,
}

/// Machine-readable failure codes error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Every candidate agent was exhausted with no positive result.
    NoDataFound,
    /// The fallback agent detected a persistent challenge page.
    CloudflareBlocked,
    /// The fallback agent scraped a page but found no date.
    NoEolDateFound,
    /// An agent raised an internal exception, caught at its boundary.
    AgentException,
    /// The persistent cache store is offline; the operation proceeded memory-only.
    CacheUnavailable,
    /// An upstream HTTP source returned non-2xx or failed to parse.
    ScrapeFailed,
}

/// The failure half of the EOL response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeError {
    /// Human-readable explanation, rendered by the operator UI.
    pub message: String,
    /// Machine-readable error code.
    pub code: ErrorCode,
}

/// The uniform success/failure response every agent produces.
///
/// Invariant: if `success` is `true`, at least one of `eol_date`,
/// `support_end_date`, or `release_date` is `Some`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EolEnvelope {
    /// Whether the agent found usable lifecycle data.
    pub success: bool,
    /// Echoes the queried software name.
    pub software: String,
    /// Echoes the input version, or the agent-discovered cycle label.
    pub version: String,
    /// Date after which no support exists.
    pub eol_date: Option<DateTime<Utc>>,
    /// Date after which mainstream support ends.
    pub support_end_date: Option<DateTime<Utc>>,
    /// The product's release date, if known.
    pub release_date: Option<DateTime<Utc>>,
    /// Confidence in `[0, 1]`.
    pub confidence: ConfidenceScore,
    /// URL of the authoritative page consulted.
    pub source_url: Option<String>,
    /// Name of the agent that produced this envelope.
    pub agent_used: String,
    /// How the data was obtained.
    pub data_source: DataSource,
    /// Free-form evidence: cycle label, LTS flag, codename, context snippet, …
    pub additional_data: HashMap<String, serde_json::Value>,
    /// Populated only when `success` is `false`.
    pub error: Option<EnvelopeError>,
}

impl EolEnvelope {
    /// True if at least one lifecycle date is present, per the envelope invariant.
    #[must_use]
    pub fn has_lifecycle_date(&self) -> bool {
        self.eol_date.is_some() || self.support_end_date.is_some() || self.release_date.is_some()
    }
}

/// A single upstream URL an agent may consult, for UI display and scraper dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentUrl {
    /// The upstream URL.
    pub url: String,
    /// Short human-readable description (for UI display).
    pub description: String,
    /// Lower number = consulted first.
    pub priority: u8,
    /// Whether this URL is currently enabled.
    pub active: bool,
}

impl AgentUrl {
    /// Construct an active URL entry.
    #[must_use]
    pub fn new(url: &str, description: &str, priority: u8) -> Self {
        Self {
            url: url.to_string(),
            description: description.to_string(),
            priority,
            active: true,
        }
    }
}

/// A single well-known product cycle in a vendor agent's static table.
#[derive(Debug, Clone)]
pub struct StaticCycle {
    /// The cycle label, e.g. `"20.04 LTS"`, `"10.1"`.
    pub cycle: &'static str,
    /// Release date, ISO-8601.
    pub release_date: Option<&'static str>,
    /// End of mainstream support, ISO-8601.
    pub support_end_date: Option<&'static str>,
    /// End of life, ISO-8601.
    pub eol_date: Option<&'static str>,
    /// Whether this cycle is a long-term-support line.
    pub lts: bool,
}

/// A single cycle parsed out of a live HTML scrape — the owned-`String`
/// counterpart of `StaticCycle`, since scraped text cannot be `'static`.
#[derive(Debug, Clone)]
pub struct ParsedCycle {
    /// The cycle label as discovered on the page, e.g. `"20 LTS"`.
    pub cycle: String,
    /// Release date string, in whatever format the page used.
    pub release_date: Option<String>,
    /// End of mainstream support date string.
    pub support_end_date: Option<String>,
    /// End of life date string.
    pub eol_date: Option<String>,
    /// Whether the page marked this cycle as long-term-support.
    pub lts: bool,
}
