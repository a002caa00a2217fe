//! The agent contract every vendor agent and the generic fallback agent
//! implement. Rust has no duck typing, so the cache-lookup and
//! live-search paths are unified onto a single trait method.

pub mod apache;
pub mod base;
pub mod endoflife;
pub mod fallback;
pub mod microsoft;
pub mod nodejs;
pub mod oracle;
pub mod php;
pub mod postgresql;
pub mod python;
pub mod redhat;
pub mod ubuntu;
pub mod vendor;
pub mod vmware;

use crate::domain_types::{AgentUrl, EolEnvelope, SoftwareName, SoftwareVersion};
use async_trait::async_trait;
use std::sync::Arc;

/// Result of a cache-purge request against a single agent.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PurgeResult {
    /// Whether the purge completed without error.
    pub success: bool,
    /// Number of cache entries removed.
    pub deleted_count: u64,
}

/// The uniform interface every vendor-scoped EOL agent implements.
#[async_trait]
pub trait EolAgent: Send + Sync {
    /// The agent's stable name, used for routing, caching, and telemetry.
    fn name(&self) -> &str;

    /// Keyword match against this agent's vendor lexicon.
    fn is_relevant(&self, software: &SoftwareName) -> bool;

    /// The ordered upstream URL registry, for UI display and scraper dispatch.
    fn urls(&self) -> &[AgentUrl];

    /// The main entry point: cache → static table → scrape → failure.
    async fn get_eol_data(
        &self,
        software: &SoftwareName,
        version: Option<&SoftwareVersion>,
    ) -> EolEnvelope;

    /// Purge this agent's cache entries for the given software/version.
    async fn purge_cache(
        &self,
        software: Option<&SoftwareName>,
        version: Option<&SoftwareVersion>,
    ) -> PurgeResult;
}

/// A compile-time list of `{agent, keywords}` the orchestrator's routing
/// map consults, re-architected from the source's dynamic keyword
/// dictionary into a static slice
pub struct AgentRegistration {
    /// The agent instance.
    pub agent: Arc<dyn EolAgent>,
    /// Keywords the orchestrator's routing map matches against the query.
    pub keywords: &'static [&'static str],
}

/// A single parsed row from a vendor's bulk-fetch listing page.
#[derive(Debug, Clone)]
pub struct BulkCycle {
    /// The cycle label.
    pub cycle: String,
    /// The envelope to cache for this cycle.
    pub envelope: EolEnvelope,
}
