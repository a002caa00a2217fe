//! Per-agent and per-URL telemetry: requests, hits, misses, latency, errors.
//!
//! A lock-per-agent collector: counters use one `Mutex` per agent so a
//! write to one agent's counters never blocks another's, and `snapshot()`
//! takes every lock briefly in alphabetical-by-agent-name order to avoid
//! deadlock.

use serde::Serialize;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

/// Bound on the recent-activity ring buffer.
const RECENT_ACTIVITY_CAPACITY: usize = 100;

/// One request's worth of telemetry, as reported by an agent or the orchestrator.
#[derive(Debug, Clone)]
pub struct RequestRecord<'a> {
    /// The agent that served (or attempted to serve) this request.
    pub agent: &'a str,
    /// Wall-clock time the request took.
    pub response_time_ms: f64,
    /// Whether the cache was hit. `None` when the call site has no cache concept.
    pub hit: Option<bool>,
    /// Whether the call failed outright (distinct from a cache miss).
    pub error: bool,
    /// Software name queried, for the recent-activity entry.
    pub software: Option<String>,
    /// Version queried, for the recent-activity entry.
    pub version: Option<String>,
    /// Upstream URL consulted, if any — also updates the per-URL counters.
    pub url: Option<String>,
    /// Rows parsed from a scraped listing page, if this was a bulk fetch.
    pub records_extracted: Option<u64>,
}

impl<'a> RequestRecord<'a> {
    /// Start building a record for `agent`.
    #[must_use]
    pub fn new(agent: &'a str, response_time_ms: f64) -> Self {
        Self {
            agent,
            response_time_ms,
            hit: None,
            error: false,
            software: None,
            version: None,
            url: None,
            records_extracted: None,
        }
    }

    /// Mark this request as a cache hit or miss.
    #[must_use]
    pub fn with_hit(mut self, hit: bool) -> Self {
        self.hit = Some(hit);
        self
    }

    /// Mark this request as an error.
    #[must_use]
    pub fn with_error(mut self, error: bool) -> Self {
        self.error = error;
        self
    }

    /// Attach the software/version that was queried.
    #[must_use]
    pub fn with_query(mut self, software: impl Into<String>, version: Option<String>) -> Self {
        self.software = Some(software.into());
        self.version = version;
        self
    }

    /// Attach the upstream URL consulted.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attach a row count extracted from a bulk-fetch listing page.
    #[must_use]
    pub fn with_records_extracted(mut self, count: u64) -> Self {
        self.records_extracted = Some(count);
        self
    }
}

/// A single recent-activity summary entry.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    /// Software name queried.
    pub software: Option<String>,
    /// Version queried.
    pub version: Option<String>,
    /// Response time, in milliseconds.
    pub response_time_ms: f64,
    /// Whether the call resulted in a hit.
    pub hit: Option<bool>,
    /// Whether the call errored.
    pub error: bool,
}

/// Per-URL counters within an agent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UrlCounters {
    /// Total requests against this URL.
    pub request_count: u64,
    /// Count of cache hits.
    pub hit_count: u64,
    /// Count of cache misses.
    pub miss_count: u64,
    /// Cumulative latency across all requests, in milliseconds.
    pub cumulative_latency_ms: f64,
    /// Minimum observed latency, in milliseconds.
    pub min_latency_ms: Option<f64>,
    /// Maximum observed latency, in milliseconds.
    pub max_latency_ms: Option<f64>,
    /// Count of errored requests.
    pub error_count: u64,
    /// Total rows parsed from scraped listing pages at this URL.
    pub records_extracted: u64,
}

/// Per-agent counters, the unit telemetry locks individually.
#[derive(Debug, Default)]
struct AgentCounters {
    request_count: u64,
    hit_count: u64,
    miss_count: u64,
    cumulative_latency_ms: f64,
    min_latency_ms: Option<f64>,
    max_latency_ms: Option<f64>,
    error_count: u64,
    last_request_at: Option<Instant>,
    per_url: HashMap<String, UrlCounters>,
    recent_activity: VecDeque<ActivityEntry>,
}

impl AgentCounters {
    fn record(&mut self, record: &RequestRecord<'_>) {
        self.request_count += 1;
        self.cumulative_latency_ms += record.response_time_ms;
        self.min_latency_ms = Some(
            self.min_latency_ms
                .map_or(record.response_time_ms, |m| m.min(record.response_time_ms)),
        );
        self.max_latency_ms = Some(
            self.max_latency_ms
                .map_or(record.response_time_ms, |m| m.max(record.response_time_ms)),
        );
        self.last_request_at = Some(Instant::now());

        if record.error {
            self.error_count += 1;
        } else if let Some(hit) = record.hit {
            if hit {
                self.hit_count += 1;
            } else {
                self.miss_count += 1;
            }
        }

        if let Some(url) = &record.url {
            let counters = self.per_url.entry(url.clone()).or_default();
            counters.request_count += 1;
            counters.cumulative_latency_ms += record.response_time_ms;
            counters.min_latency_ms = Some(
                counters
                    .min_latency_ms
                    .map_or(record.response_time_ms, |m| m.min(record.response_time_ms)),
            );
            counters.max_latency_ms = Some(
                counters
                    .max_latency_ms
                    .map_or(record.response_time_ms, |m| m.max(record.response_time_ms)),
            );
            if record.error {
                counters.error_count += 1;
            } else if let Some(hit) = record.hit {
                if hit {
                    counters.hit_count += 1;
                } else {
                    counters.miss_count += 1;
                }
            }
            if let Some(extracted) = record.records_extracted {
                counters.records_extracted += extracted;
            }
        }

        if self.recent_activity.len() >= RECENT_ACTIVITY_CAPACITY {
            self.recent_activity.pop_front();
        }
        self.recent_activity.push_back(ActivityEntry {
            software: record.software.clone(),
            version: record.version.clone(),
            response_time_ms: record.response_time_ms,
            hit: record.hit,
            error: record.error,
        });
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            request_count: self.request_count,
            hit_count: self.hit_count,
            miss_count: self.miss_count,
            error_count: self.error_count,
            avg_response_time_ms: if self.request_count == 0 {
                0.0
            } else {
                self.cumulative_latency_ms / self.request_count as f64
            },
            min_latency_ms: self.min_latency_ms.unwrap_or(0.0),
            max_latency_ms: self.max_latency_ms.unwrap_or(0.0),
            hit_rate: hit_rate(self.hit_count, self.miss_count),
            error_rate: if self.request_count == 0 {
                0.0
            } else {
                self.error_count as f64 / self.request_count as f64
            },
            per_url: self.per_url.clone(),
            recent_activity: self.recent_activity.iter().cloned().collect(),
        }
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// An immutable, serializable view of one agent's counters.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    /// Total requests this agent has served.
    pub request_count: u64,
    /// Count of cache hits.
    pub hit_count: u64,
    /// Count of cache misses.
    pub miss_count: u64,
    /// Count of errored requests.
    pub error_count: u64,
    /// Average response time, in milliseconds.
    pub avg_response_time_ms: f64,
    /// Minimum observed latency, in milliseconds.
    pub min_latency_ms: f64,
    /// Maximum observed latency, in milliseconds.
    pub max_latency_ms: f64,
    /// `hits / (hits + misses)`, zero when there have been no cacheable requests.
    pub hit_rate: f64,
    /// `errors / requests`, zero when there have been no requests.
    pub error_rate: f64,
    /// Per-URL breakdown.
    pub per_url: HashMap<String, UrlCounters>,
    /// The most recent activity, oldest first.
    pub recent_activity: Vec<ActivityEntry>,
}

/// Global counters summarizing every agent.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalSummary {
    /// Total requests across every agent.
    pub total_requests: u64,
    /// Total cache hits across every agent.
    pub total_hits: u64,
    /// Total cache misses across every agent.
    pub total_misses: u64,
    /// Total errors across every agent.
    pub total_errors: u64,
    /// Process uptime, in seconds.
    pub uptime_secs: u64,
    /// Overall hit rate across every agent.
    pub overall_hit_rate: f64,
    /// Overall average response time, in milliseconds.
    pub avg_response_time_ms: f64,
}

/// An immutable view of every agent's counters plus the global summary.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    /// Per-agent breakdown, keyed by agent name.
    pub agents: HashMap<String, AgentSnapshot>,
    /// Global roll-up counters.
    pub summary: GlobalSummary,
}

/// The telemetry collector: one lock per agent, taken in alphabetical order
/// during `snapshot()` to avoid deadlock.
pub struct TelemetryCollector {
    agents: Mutex<HashMap<String, Mutex<AgentCounters>>>,
    started_at: Instant,
}

impl TelemetryCollector {
    /// Construct an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            agents: Mutex::new(HashMap::new()),
            started_at: Instant::now(),
        }
    }

    /// Record a single request's telemetry for `record.agent`.
    pub fn record_request(&self, record: RequestRecord<'_>) {
        let mut agents = self.agents.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = agents
            .entry(record.agent.to_string())
            .or_insert_with(|| Mutex::new(AgentCounters::default()));
        entry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .record(&record);
    }

    /// Immutable snapshot of every agent plus the global summary.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let agents_guard = self.agents.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut names: Vec<&String> = agents_guard.keys().collect();
        names.sort();

        let mut agents = HashMap::new();
        let (mut total_requests, mut total_hits, mut total_misses, mut total_errors) =
            (0u64, 0u64, 0u64, 0u64);
        let mut total_latency = 0.0;

        for name in names {
            let counters = agents_guard[name]
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            total_requests += counters.request_count;
            total_hits += counters.hit_count;
            total_misses += counters.miss_count;
            total_errors += counters.error_count;
            total_latency += counters.cumulative_latency_ms;
            agents.insert(name.clone(), counters.snapshot());
        }

        TelemetrySnapshot {
            agents,
            summary: GlobalSummary {
                total_requests,
                total_hits,
                total_misses,
                total_errors,
                uptime_secs: self.started_at.elapsed().as_secs(),
                overall_hit_rate: hit_rate(total_hits, total_misses),
                avg_response_time_ms: if total_requests == 0 {
                    0.0
                } else {
                    total_latency / total_requests as f64
                },
            },
        }
    }

    /// Zero all counters and buffers.
    pub fn reset(&self) {
        self.agents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_and_error_rate_are_zero_with_no_requests() {
        let collector = TelemetryCollector::new();
        let snapshot = collector.snapshot();
        assert_eq!(snapshot.summary.overall_hit_rate, 0.0);
        assert_eq!(snapshot.summary.avg_response_time_ms, 0.0);
    }

    #[test]
    fn records_accumulate_hits_and_misses_per_agent() {
        let collector = TelemetryCollector::new();
        collector.record_request(RequestRecord::new("ubuntu", 10.0).with_hit(true));
        collector.record_request(RequestRecord::new("ubuntu", 20.0).with_hit(false));
        collector.record_request(RequestRecord::new("ubuntu", 5.0).with_error(true));

        let snapshot = collector.snapshot();
        let ubuntu = &snapshot.agents["ubuntu"];
        assert_eq!(ubuntu.request_count, 3);
        assert_eq!(ubuntu.hit_count, 1);
        assert_eq!(ubuntu.miss_count, 1);
        assert_eq!(ubuntu.error_count, 1);
        assert!((ubuntu.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn per_url_counters_track_records_extracted() {
        let collector = TelemetryCollector::new();
        collector.record_request(
            RequestRecord::new("apache", 15.0)
                .with_hit(false)
                .with_url("https://tomcat.apache.org")
                .with_records_extracted(12),
        );

        let snapshot = collector.snapshot();
        let url_counters = &snapshot.agents["apache"].per_url["https://tomcat.apache.org"];
        assert_eq!(url_counters.records_extracted, 12);
        assert_eq!(url_counters.request_count, 1);
    }

    #[test]
    fn reset_clears_all_agents() {
        let collector = TelemetryCollector::new();
        collector.record_request(RequestRecord::new("ubuntu", 10.0).with_hit(true));
        collector.reset();
        let snapshot = collector.snapshot();
        assert!(snapshot.agents.is_empty());
        assert_eq!(snapshot.summary.total_requests, 0);
    }

    #[test]
    fn recent_activity_is_bounded_to_100_entries() {
        let collector = TelemetryCollector::new();
        for i in 0..150 {
            collector.record_request(RequestRecord::new("ubuntu", f64::from(i)).with_hit(true));
        }
        let snapshot = collector.snapshot();
        assert_eq!(snapshot.agents["ubuntu"].recent_activity.len(), 100);
    }
}
