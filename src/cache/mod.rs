//! The two-tier cache: an in-process memory layer fronting a persistent
//! `SQLite` tier (standing in for a document-store container named
//! `eol_cache`, partition key `cache_key` — see DESIGN.md). Keyed by
//! `(agent, software, version)`, with TTL and a lazy-delete-on-read expiry
//! policy.

pub mod memory;
pub mod persistent;

use crate::domain_types::{EolEnvelope, SoftwareName, SoftwareVersion, version_or_any};
use chrono::{DateTime, Utc};
use memory::MemoryTier;
use persistent::PersistentTier;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The persisted row shape, mirroring `CachedEOLResponse` in the original
/// source (`utils/eol_cache.py`) plus the `cache_key` partition key.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// `cache_key`: a 16-hex-char SHA-256-derived hash of `agent|software|version`.
    pub id: String,
    /// Name of the agent that produced this entry.
    pub agent_name: String,
    /// Software name as queried (not normalized).
    pub software_name: String,
    /// Version as queried, or `"any"`.
    pub version: String,
    /// The full envelope this entry caches.
    pub response_data: EolEnvelope,
    /// Confidence level at time of write.
    pub confidence_level: f64,
    /// When this entry was written.
    pub created_at: DateTime<Utc>,
    /// When this entry should be considered stale.
    pub expires_at: DateTime<Utc>,
    /// The upstream URL consulted, if any.
    pub source_url: Option<String>,
    /// Whether a human or higher-confidence source has verified this entry.
    pub verified: bool,
    /// Optional free-text verification status.
    pub verification_status: Option<String>,
    /// Entries marked as failed are treated as absent on read.
    pub marked_as_failed: bool,
}

impl CacheEntry {
    /// Whether this entry is live: unexpired and not marked as failed.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.marked_as_failed && self.expires_at > now
    }
}

/// Derive the 16-hex-char cache key for `(agent, software, version)`.
///
/// Hashes `"{agent}_{software}_{version_or_'any'}".lower()` with SHA-256,
/// truncated to 16 hex characters (see DESIGN.md for why SHA-256 over
/// MD5).
#[must_use]
pub fn cache_key(agent: &str, software: &SoftwareName, version: Option<&SoftwareVersion>) -> String {
    let key_data = format!(
        "{}_{}_{}",
        agent.to_lowercase(),
        software.normalized(),
        version_or_any(version)
    );
    let digest = Sha256::digest(key_data.as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// Aggregate cache statistics `stats()` contract.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CacheStats {
    /// Total rows in the persistent store (or memory tier if persistent is unavailable).
    pub total: u64,
    /// Rows whose `expires_at` has passed.
    pub expired: u64,
    /// Rows that are live.
    pub active: u64,
    /// Row counts broken down by agent name.
    pub per_agent_counts: std::collections::HashMap<String, u64>,
}

/// The two-tier cache facade the orchestrator and every agent depend on.
pub struct TieredCache {
    memory: MemoryTier,
    persistent: Option<PersistentTier>,
    ttl: chrono::Duration,
    stats_cache: Mutex<Option<(DateTime<Utc>, CacheStats)>>,
}

/// How long a `stats()` call's result is cached internally
const STATS_CACHE_TTL: chrono::Duration = chrono::Duration::minutes(5);

impl TieredCache {
    /// Build a cache fronting the given persistent tier with the given TTL.
    #[must_use]
    pub fn new(persistent: Option<PersistentTier>, ttl_days: i64) -> Self {
        Self {
            memory: MemoryTier::new(),
            persistent,
            ttl: chrono::Duration::days(ttl_days),
            stats_cache: Mutex::new(None),
        }
    }

    /// Wrap an existing cache behind an `Arc`, the shape every agent and the
    /// orchestrator hold a clone of.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Tiered read: memory first, then persistent with promotion on hit.
    pub async fn get(
        &self,
        software: &SoftwareName,
        version: Option<&SoftwareVersion>,
        agent: &str,
    ) -> Option<EolEnvelope> {
        let key = cache_key(agent, software, version);
        let now = Utc::now();

        if let Some(entry) = self.memory.get(&key) {
            if entry.is_live(now) {
                debug!(agent, key = %key, "cache: memory hit");
                return Some(entry.response_data);
            }
            debug!(agent, key = %key, "cache: memory entry expired, evicting");
            self.memory.remove(&key);
        }

        let Some(persistent) = &self.persistent else {
            return None;
        };

        match persistent.query_best(&key).await {
            Ok(Some(entry)) => {
                if entry.is_live(now) {
                    debug!(agent, key = %key, "cache: persistent hit, promoting to memory");
                    self.memory.put(entry.clone());
                    Some(entry.response_data)
                } else {
                    let _ = persistent.delete(&key).await;
                    None
                }
            }
            Ok(None) => None,
            Err(e) => {
                warn!(agent, key = %key, error = %e, "cache: persistent read failed, treating as miss");
                None
            }
        }
    }

    /// Tiered write: upsert persistent, then populate memory regardless of
    /// the persistent result (best-effort, never raises to the caller).
    pub async fn put(
        &self,
        software: &SoftwareName,
        version: Option<&SoftwareVersion>,
        agent: &str,
        envelope: EolEnvelope,
        source_url: Option<String>,
        verified: bool,
        verification_status: Option<String>,
    ) -> bool {
        let key = cache_key(agent, software, version);
        let now = Utc::now();
        let entry = CacheEntry {
            id: key.clone(),
            agent_name: agent.to_string(),
            software_name: software.as_ref().to_string(),
            version: version_or_any(version),
            confidence_level: envelope.confidence.value(),
            response_data: envelope,
            created_at: now,
            expires_at: now + self.ttl,
            source_url,
            verified,
            verification_status,
            marked_as_failed: false,
        };

        if let Some(persistent) = &self.persistent
            && let Err(e) = persistent.upsert(&entry).await
        {
            warn!(agent, key = %key, error = %e, "cache: persistent write failed, memory-only for this process");
        }

        self.memory.put(entry);
        true
    }

    /// Mass deletion by optional software/agent filter.
    pub async fn purge(&self, software: Option<&str>, agent: Option<&str>) -> u64 {
        let mem_deleted = self.memory.purge(software, agent);
        let persistent_deleted = if let Some(persistent) = &self.persistent {
            persistent.purge(software, agent).await.unwrap_or_else(|e| {
                warn!(error = %e, "cache: persistent purge failed");
                0
            })
        } else {
            0
        };
        mem_deleted.max(persistent_deleted)
    }

    /// Aggregate counters, cached internally for 5 minutes.
    pub async fn stats(&self) -> CacheStats {
        let now = Utc::now();
        {
            let cached = self.stats_cache.lock().await;
            if let Some((at, stats)) = cached.as_ref()
                && now - *at < STATS_CACHE_TTL
            {
                return stats.clone();
            }
        }

        let stats = if let Some(persistent) = &self.persistent {
            persistent.stats().await.unwrap_or_else(|e| {
                warn!(error = %e, "cache: persistent stats failed, falling back to memory");
                self.memory.stats()
            })
        } else {
            self.memory.stats()
        };

        *self.stats_cache.lock().await = Some((now, stats.clone()));
        stats
    }

    /// Whether the persistent tier is currently reachable.
    #[must_use]
    pub fn persistent_available(&self) -> bool {
        self.persistent.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_deterministic_and_case_insensitive() {
        let software = SoftwareName::try_new("Ubuntu").unwrap();
        let version = SoftwareVersion::try_new("20.04").unwrap();
        let a = cache_key("ubuntu", &software, Some(&version));

        let software2 = SoftwareName::try_new("ubuntu").unwrap();
        let b = cache_key("ubuntu", &software2, Some(&version));

        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn cache_key_differs_by_agent_namespace() {
        let software = SoftwareName::try_new("tomcat").unwrap();
        let a = cache_key("apache", &software, None);
        let b = cache_key("endoflife", &software, None);
        assert_ne!(a, b);
    }

    #[test]
    fn missing_version_uses_any_sentinel() {
        let software = SoftwareName::try_new("rhel").unwrap();
        let with_any = cache_key("redhat", &software, None);
        let version = SoftwareVersion::try_new("any").unwrap();
        let explicit_any = cache_key("redhat", &software, Some(&version));
        assert_eq!(with_any, explicit_any);
    }

    #[tokio::test]
    async fn memory_only_cache_round_trips_a_put_and_get() {
        let cache = TieredCache::new(None, 30);
        let software = SoftwareName::try_new("tomcat").unwrap();
        let version = SoftwareVersion::try_new("10.1").unwrap();

        let envelope = crate::agents::base::success_envelope(
            "apache",
            "tomcat",
            "10.1",
            None,
            None,
            None,
            crate::domain_types::ConfidenceScore::clamp(0.9),
            Some("https://tomcat.apache.org".to_string()),
            crate::domain_types::DataSource::Static,
        );

        assert!(
            cache
                .put(
                    &software,
                    Some(&version),
                    "apache",
                    envelope,
                    Some("https://tomcat.apache.org".to_string()),
                    false,
                    None,
                )
                .await
        );

        let fetched = cache.get(&software, Some(&version), "apache").await;
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().agent_used, "apache");
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache = TieredCache::new(None, -1);
        let software = SoftwareName::try_new("tomcat").unwrap();

        let envelope = crate::agents::base::success_envelope(
            "apache",
            "tomcat",
            "10.1",
            None,
            None,
            None,
            crate::domain_types::ConfidenceScore::clamp(0.9),
            None,
            crate::domain_types::DataSource::Static,
        );

        cache
            .put(&software, None, "apache", envelope, None, false, None)
            .await;

        assert!(cache.get(&software, None, "apache").await.is_none());
    }
}
