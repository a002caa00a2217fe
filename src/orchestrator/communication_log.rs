//! The per-session, bounded communication log the UI renders: every
//! routing decision, agent call, and result becomes a formatted entry in a
//! ring buffer capped at 100, the same bound telemetry's recent-activity
//! buffer uses.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Bound on the communication ring buffer.
const CAPACITY: usize = 100;

/// One entry in the session's communication log.
#[derive(Debug, Clone, Serialize)]
pub struct CommunicationEntry {
    /// When this entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// The pre-formatted, emoji-tagged message
    pub message: String,
}

impl CommunicationEntry {
    fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}

/// Pure formatter: a routing decision was made for `software`.
#[must_use]
pub fn routing_message(software: &str, candidates: &[&str]) -> String {
    format!("🔀 Routing {software} to agents: {}", candidates.join(", "))
}

/// Pure formatter: `agent` is about to be consulted.
#[must_use]
pub fn agent_selection_message(agent: &str) -> String {
    format!("📡 Consulting {agent}")
}

/// Pure formatter: `agent` found usable EOL data for `software`.
#[must_use]
pub fn found_message(agent: &str, software: &str) -> String {
    format!("🔍 {agent} found EOL data for {software}")
}

/// Pure formatter: `agent` failed to find usable EOL data for `software`.
#[must_use]
pub fn failed_message(agent: &str, software: &str) -> String {
    format!("❌ {agent} failed to find EOL data for {software}")
}

/// Pure formatter: a previously computed decision was served from the
/// session cache instead of re-running the candidate list.
#[must_use]
pub fn cached_decision_message(software: &str) -> String {
    format!("⚡ Using cached decision for {software}")
}

/// Pure formatter: every candidate agent was exhausted.
#[must_use]
pub fn exhausted_message(software: &str) -> String {
    format!("🛑 No agent found EOL data for {software}")
}

/// A bounded ring buffer of communication entries for one session.
#[derive(Debug, Default)]
pub struct CommunicationLog {
    entries: VecDeque<CommunicationEntry>,
}

impl CommunicationLog {
    /// Construct an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pre-formatted message, evicting the oldest entry if full.
    pub fn push(&mut self, message: impl Into<String>) {
        if self.entries.len() >= CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(CommunicationEntry::new(message));
    }

    /// Snapshot every entry, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<CommunicationEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_bounded_to_100_entries() {
        let mut log = CommunicationLog::new();
        for i in 0..150 {
            log.push(format!("entry {i}"));
        }
        assert_eq!(log.len(), 100);
        assert_eq!(log.entries().first().unwrap().message, "entry 50");
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = CommunicationLog::new();
        log.push("hello");
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn formatters_match_the_documented_emoji_tags() {
        assert_eq!(routing_message("ubuntu", &["ubuntu", "endoflife"]), "🔀 Routing ubuntu to agents: ubuntu, endoflife");
        assert_eq!(found_message("ubuntu", "ubuntu"), "🔍 ubuntu found EOL data for ubuntu");
        assert_eq!(failed_message("ubuntu", "ubuntu"), "❌ ubuntu failed to find EOL data for ubuntu");
    }
}
