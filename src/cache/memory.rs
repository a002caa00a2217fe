//! The hot in-process tier of the two-tier cache.
//!
//! Backed by `dashmap` for sharded, lock-free concurrent access, rather
//! than a single global `Mutex<HashMap>`.

use super::{CacheEntry, CacheStats};
use dashmap::DashMap;

/// The memory tier: a bounded, sharded hot map of the most recently used
/// cache entries for this process.
pub struct MemoryTier {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryTier {
    /// Construct an empty memory tier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Look up an entry by its cache key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.clone())
    }

    /// Upsert an entry by its `id`.
    pub fn put(&self, entry: CacheEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Evict an entry by its cache key.
    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Delete entries matching the given software/agent filter; returns the
    /// number deleted.
    pub fn purge(&self, software: Option<&str>, agent: Option<&str>) -> u64 {
        let software = software.map(str::to_lowercase);
        let agent = agent.map(str::to_lowercase);

        let to_remove: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| {
                let software_matches = software
                    .as_ref()
                    .is_none_or(|s| entry.software_name.to_lowercase().contains(s.as_str()));
                let agent_matches = agent
                    .as_ref()
                    .is_none_or(|a| entry.agent_name.to_lowercase() == *a);
                software_matches && agent_matches
            })
            .map(|entry| entry.id.clone())
            .collect();

        let count = to_remove.len() as u64;
        for key in to_remove {
            self.entries.remove(&key);
        }
        count
    }

    /// Snapshot aggregate counters for the memory tier alone (used as a
    /// fallback when the persistent tier is unavailable).
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let now = chrono::Utc::now();
        let mut stats = CacheStats::default();
        for entry in &self.entries {
            stats.total += 1;
            if entry.is_live(now) {
                stats.active += 1;
            } else {
                stats.expired += 1;
            }
            *stats
                .per_agent_counts
                .entry(entry.agent_name.clone())
                .or_insert(0) += 1;
        }
        stats
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_types::{ConfidenceScore, DataSource};
    use chrono::Utc;

    fn sample_entry(agent: &str, software: &str) -> CacheEntry {
        CacheEntry {
            id: format!("{agent}-{software}"),
            agent_name: agent.to_string(),
            software_name: software.to_string(),
            version: "any".to_string(),
            response_data: crate::agents::base::success_envelope(
                agent,
                software,
                "any",
                None,
                None,
                None,
                ConfidenceScore::clamp(0.9),
                None,
                DataSource::Static,
            ),
            confidence_level: 0.9,
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::days(30),
            source_url: None,
            verified: false,
            verification_status: None,
            marked_as_failed: false,
        }
    }

    #[test]
    fn purge_by_agent_only_removes_matching_entries() {
        let tier = MemoryTier::new();
        tier.put(sample_entry("apache", "tomcat"));
        tier.put(sample_entry("ubuntu", "ubuntu"));

        let deleted = tier.purge(None, Some("apache"));
        assert_eq!(deleted, 1);
        assert!(tier.get("apache-tomcat").is_none());
        assert!(tier.get("ubuntu-ubuntu").is_some());
    }

    #[test]
    fn purge_by_software_substring_matches_case_insensitively() {
        let tier = MemoryTier::new();
        tier.put(sample_entry("ubuntu", "Ubuntu"));

        let deleted = tier.purge(Some("ubuntu"), None);
        assert_eq!(deleted, 1);
    }
}
