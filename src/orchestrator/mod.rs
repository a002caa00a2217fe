//! The orchestrator: routes a lookup to candidate agents, scores their
//! answers, post-processes the winner into a risk assessment, and keeps the
//! per-session communication log and decision cache.

pub mod communication_log;
pub mod confidence;
pub mod inventory;
pub mod risk;
pub mod routing;

use crate::agents::vendor::VendorAgent;
use crate::agents::{AgentRegistration, EolAgent};
use crate::cache::TieredCache;
use crate::domain_types::{EolEnvelope, ParsedCycle, SoftwareName, SoftwareVersion, version_or_any};
use crate::telemetry::TelemetryCollector;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use communication_log::{
    CommunicationEntry, CommunicationLog, agent_selection_message, cached_decision_message, failed_message,
    found_message, routing_message,
};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use uuid::Uuid;

/// How long a session-cached decision is served before the routing/scoring
/// pipeline runs again session cache.
const SESSION_CACHE_TTL: ChronoDuration = ChronoDuration::hours(1);

/// Ceiling on concurrent in-flight agent calls during bulk cache warming,
///
const WARM_CONCURRENCY: usize = 10;

/// Ceiling on concurrent in-flight lookups during a multi-target scan.
const SCAN_CONCURRENCY: usize = 8;

/// The fully post-processed payload a successful lookup returns.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedData {
    /// Echoes the queried software name.
    pub software: String,
    /// Echoes the queried version, or the winning agent's discovered cycle.
    pub version: String,
    /// Date after which no support exists.
    pub eol_date: Option<DateTime<Utc>>,
    /// Date after which mainstream support ends.
    pub support_end_date: Option<DateTime<Utc>>,
    /// The product's release date, if known.
    pub release_date: Option<DateTime<Utc>>,
    /// Confidence in `[0, 1]`, as scored by this lookup (not the agent's own).
    pub confidence: f64,
    /// URL of the authoritative page consulted.
    pub source_url: Option<String>,
    /// How the data was obtained.
    pub data_source: crate::domain_types::DataSource,
    /// Free-form evidence carried over from the winning envelope.
    pub additional_data: HashMap<String, serde_json::Value>,
    /// Days between now and `eol_date`, when known.
    pub days_until_eol: Option<i64>,
    /// Human-readable status, e.g. `"Active Support"`.
    pub status: Option<&'static str>,
    /// Machine-readable risk level, e.g. `"low"`.
    pub risk_level: Option<&'static str>,
}

/// The orchestrator's response to one `lookup` call
#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    /// Whether any candidate agent produced usable lifecycle data.
    pub success: bool,
    /// The winning agent's post-processed data, when `success` is `true`.
    pub data: Option<ProcessedData>,
    /// Name of the agent whose answer won, or `"orchestrator"` on exhaustion.
    pub agent_used: String,
    /// This lookup's own confidence score, distinct from the agent's.
    pub confidence: f64,
    /// Every communication-log entry emitted while answering this call.
    pub communications: Vec<CommunicationEntry>,
    /// Populated only when `success` is `false`.
    pub error: Option<crate::domain_types::EnvelopeError>,
}

/// Response to a `health()` probe
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// Whether the orchestrator itself is responsive.
    pub status: &'static str,
    /// Whether the persistent cache tier is reachable.
    pub cache_available: bool,
    /// A quick, non-blocking check of whether each probed agent is registered
    /// and able to evaluate relevance without error.
    pub agents: HashMap<String, bool>,
}

/// Result of `clear_communications()`
#[derive(Debug, Clone, Serialize)]
pub struct ClearCommunicationsResult {
    /// Always `true`; clearing cannot fail.
    pub success: bool,
    /// Number of communication-log entries removed.
    pub cleared: u64,
    /// The session identifier retired by this call.
    pub old_session: Uuid,
    /// The new session identifier assigned for subsequent lookups.
    pub new_session: Uuid,
}

struct SessionCacheEntry {
    response: LookupResponse,
    cached_at: DateTime<Utc>,
}

struct SessionState {
    session_id: Uuid,
    cache: HashMap<String, SessionCacheEntry>,
    log: CommunicationLog,
}

impl SessionState {
    fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            cache: HashMap::new(),
            log: CommunicationLog::new(),
        }
    }
}

/// A vendor agent whose static table can be refreshed in bulk. Only a
/// subset of vendor agents expose a multi-row listing parser; the rest are
/// single-cycle lookups only.
struct BulkFetchable {
    name: &'static str,
    agent: Arc<VendorAgent>,
    parser: fn(&str) -> Vec<ParsedCycle>,
}

/// Ties together routing, confidence scoring, risk derivation, and the
/// per-session communication log into the single `lookup` entry point every
/// HTTP handler and CLI invocation goes through.
pub struct Orchestrator {
    registrations: Vec<AgentRegistration>,
    by_name: HashMap<String, Arc<dyn EolAgent>>,
    bulk_fetchable: Vec<BulkFetchable>,
    cache: Arc<TieredCache>,
    session: Mutex<SessionState>,
}

impl Orchestrator {
    /// Construct the orchestrator, building every vendor agent, the generic
    /// `endoflife` agent, and the `fallback` agent from the same shared
    /// cache/telemetry handles.
    #[must_use]
    pub fn new(
        cache: Arc<TieredCache>,
        telemetry: Arc<TelemetryCollector>,
        http_timeout: std::time::Duration,
        fetch_timeout: std::time::Duration,
        llm: Option<crate::agents::fallback::LlmConfig>,
    ) -> Self {
        use crate::agents::{apache, endoflife, fallback, microsoft, nodejs, oracle, php, postgresql, python, redhat, ubuntu, vmware};

        let microsoft_agent = Arc::new(microsoft::build(cache.clone(), telemetry.clone(), http_timeout));
        let redhat_agent = Arc::new(redhat::build(cache.clone(), telemetry.clone(), http_timeout));
        let ubuntu_agent = Arc::new(ubuntu::build(cache.clone(), telemetry.clone(), http_timeout));
        let apache_agent = Arc::new(apache::build(cache.clone(), telemetry.clone(), http_timeout));
        let nodejs_agent = Arc::new(nodejs::build(cache.clone(), telemetry.clone(), http_timeout));
        let python_agent = Arc::new(python::build(cache.clone(), telemetry.clone(), http_timeout));
        let php_agent = Arc::new(php::build(cache.clone(), telemetry.clone(), http_timeout));
        let postgresql_agent = Arc::new(postgresql::build(cache.clone(), telemetry.clone(), http_timeout));
        let oracle_agent = Arc::new(oracle::build(cache.clone(), telemetry.clone(), http_timeout));
        let vmware_agent = Arc::new(vmware::build(cache.clone(), telemetry.clone(), http_timeout));
        let endoflife_agent: Arc<dyn EolAgent> =
            Arc::new(endoflife::EndOfLifeAgent::new(cache.clone(), telemetry.clone(), http_timeout));
        let fallback_agent: Arc<dyn EolAgent> =
            Arc::new(fallback::FallbackAgent::new(cache.clone(), telemetry.clone(), fetch_timeout, llm));

        let registrations = vec![
            AgentRegistration { agent: microsoft_agent.clone() as Arc<dyn EolAgent>, keywords: microsoft::KEYWORDS },
            AgentRegistration { agent: redhat_agent.clone() as Arc<dyn EolAgent>, keywords: redhat::KEYWORDS },
            AgentRegistration { agent: ubuntu_agent.clone() as Arc<dyn EolAgent>, keywords: ubuntu::KEYWORDS },
            AgentRegistration { agent: apache_agent.clone() as Arc<dyn EolAgent>, keywords: apache::KEYWORDS },
            AgentRegistration { agent: nodejs_agent.clone() as Arc<dyn EolAgent>, keywords: nodejs::KEYWORDS },
            AgentRegistration { agent: python_agent.clone() as Arc<dyn EolAgent>, keywords: python::KEYWORDS },
            AgentRegistration { agent: php_agent.clone() as Arc<dyn EolAgent>, keywords: php::KEYWORDS },
            AgentRegistration { agent: postgresql_agent.clone() as Arc<dyn EolAgent>, keywords: postgresql::KEYWORDS },
            AgentRegistration { agent: oracle_agent.clone() as Arc<dyn EolAgent>, keywords: oracle::KEYWORDS },
            AgentRegistration { agent: vmware_agent.clone() as Arc<dyn EolAgent>, keywords: vmware::KEYWORDS },
            AgentRegistration { agent: endoflife_agent.clone(), keywords: &[] },
            AgentRegistration { agent: fallback_agent.clone(), keywords: &[] },
        ];

        let mut by_name = HashMap::new();
        for reg in &registrations {
            by_name.insert(reg.agent.name().to_string(), reg.agent.clone());
        }

        let bulk_fetchable = vec![
            BulkFetchable { name: "apache", agent: apache_agent, parser: apache::bulk_parser },
            BulkFetchable { name: "nodejs", agent: nodejs_agent, parser: nodejs::bulk_parser },
            BulkFetchable { name: "ubuntu", agent: ubuntu_agent, parser: ubuntu::bulk_parser },
        ];

        Self {
            registrations,
            by_name,
            bulk_fetchable,
            cache,
            session: Mutex::new(SessionState::new()),
        }
    }

    fn push_log(&self, message: impl Into<String>) {
        let mut session = self.session.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        session.log.push(message);
    }

    fn session_key(software: &SoftwareName, version: Option<&SoftwareVersion>) -> String {
        format!("{}|{}", software.normalized(), version_or_any(version))
    }

    /// Answer one `{software, version}` query, consulting the session cache
    /// first and otherwise running the full routing → scoring → logging
    /// pipeline over `routing::build_candidates`'s ordered agent list.
    ///
    /// Dropping the returned future (e.g. on client disconnect) simply stops
    /// polling the in-flight agent call; no detached task survives it.
    pub async fn lookup(
        &self,
        software: &SoftwareName,
        version: Option<&SoftwareVersion>,
        kind: Option<&str>,
        internet_only: bool,
    ) -> LookupResponse {
        let key = Self::session_key(software, version);
        let now = Utc::now();

        {
            let mut session = self.session.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(entry) = session.cache.get(&key) {
                if now - entry.cached_at < SESSION_CACHE_TTL {
                    session.log.push(cached_decision_message(software.as_ref()));
                    let mut response = entry.response.clone();
                    if let Some(data) = response.data.as_mut() {
                        data.data_source = crate::domain_types::DataSource::Cache;
                    }
                    response.communications = session.log.entries();
                    return response;
                }
                session.cache.remove(&key);
            }
        }

        let candidates = routing::build_candidates(software, kind, internet_only);
        self.push_log(routing_message(software.as_ref(), &candidates));

        let mut best: Option<(EolEnvelope, f64)> = None;

        for name in &candidates {
            let Some(agent) = self.by_name.get(*name) else { continue };
            self.push_log(agent_selection_message(name));

            let envelope = call_agent_safely(agent.as_ref(), software, version).await;

            if envelope.success && envelope.has_lifecycle_date() {
                self.push_log(found_message(name, software.as_ref()));
                let routed_match = routing::is_vendor_routed(name) && agent.is_relevant(software);
                let confidence = confidence::score(routed_match, &envelope);

                let is_better = best.as_ref().is_none_or(|(_, best_conf)| confidence > *best_conf);
                if is_better {
                    best = Some((envelope, confidence));
                }

                if confidence >= 0.9 && *name != "fallback" {
                    break;
                }
            } else {
                self.push_log(failed_message(name, software.as_ref()));
            }
        }

        let response = match best {
            Some((envelope, confidence)) => {
                let agent_used = envelope.agent_used.clone();
                LookupResponse {
                    success: true,
                    data: Some(process_envelope(envelope, confidence)),
                    agent_used,
                    confidence,
                    communications: Vec::new(),
                    error: None,
                }
            }
            None => {
                let message = if internet_only {
                    format!("🛑 No agent found EOL data for {} (fallback agent exhausted internet-only search)", software.as_ref())
                } else {
                    communication_log::exhausted_message(software.as_ref())
                };
                self.push_log(message);
                LookupResponse {
                    success: false,
                    data: None,
                    agent_used: "orchestrator".to_string(),
                    confidence: 0.0,
                    communications: Vec::new(),
                    error: Some(crate::domain_types::EnvelopeError {
                        message: format!("no EOL data found for {} {}", software.as_ref(), version_or_any(version)),
                        code: crate::domain_types::ErrorCode::NoDataFound,
                    }),
                }
            }
        };

        let mut session = self.session.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut response = response;
        response.communications = session.log.entries();
        if response.success {
            session.cache.insert(
                key,
                SessionCacheEntry {
                    response: response.clone(),
                    cached_at: now,
                },
            );
        }
        response
    }

    /// Run `lookup` across many targets, preserving input order. Concurrency
    /// is bounded by `SCAN_CONCURRENCY` multi-target fan-out.
    pub async fn lookup_many(
        &self,
        targets: &[(SoftwareName, Option<SoftwareVersion>)],
        kind: Option<&str>,
        internet_only: bool,
    ) -> Vec<LookupResponse> {
        stream::iter(targets.iter())
            .map(|(software, version)| self.lookup(software, version.as_ref(), kind, internet_only))
            .buffered(SCAN_CONCURRENCY)
            .collect()
            .await
    }

    /// Re-download every bulk-capable vendor agent's listing page and write
    /// every parsed cycle into the cache periodic warming
    /// job. Concurrency is bounded by `WARM_CONCURRENCY`
    ///
    /// Returns the count of cycles written per agent. Agents with no
    /// multi-row listing page (everything except `apache`, `nodejs`, and
    /// `ubuntu`) sit outside this rotation entirely — their single cycle is
    /// served from the static table instead.
    pub async fn warm_caches(&self) -> Vec<(String, usize)> {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(WARM_CONCURRENCY));
        let mut tasks = Vec::with_capacity(self.bulk_fetchable.len());

        for bf in &self.bulk_fetchable {
            let semaphore = semaphore.clone();
            let agent = bf.agent.clone();
            let parser = bf.parser;
            let name = bf.name;
            tasks.push(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let count = agent.bulk_fetch(&parser).await;
                (name.to_string(), count)
            });
        }

        stream::iter(tasks).buffer_unordered(WARM_CONCURRENCY).collect().await
    }

    /// Non-blocking liveness probe Each registered agent is
    /// checked by evaluating `is_relevant` against a canary name — this never
    /// touches the network, so the whole call completes immediately.
    pub fn health(&self) -> HealthSnapshot {
        let canary = SoftwareName::try_new("eol-sentinel-health-probe").expect("canary name is non-empty");
        let mut agents = HashMap::new();
        for reg in &self.registrations {
            let ok = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| reg.agent.is_relevant(&canary))).is_ok();
            agents.insert(reg.agent.name().to_string(), ok);
        }

        HealthSnapshot {
            status: "ok",
            cache_available: self.cache.persistent_available(),
            agents,
        }
    }

    /// Reset the communication log and session decision cache, rotating the
    /// session identifier `clear_communications()`.
    pub fn clear_communications(&self) -> ClearCommunicationsResult {
        let mut session = self.session.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let cleared = session.log.len() as u64;
        let old_session = session.session_id;
        session.log.clear();
        session.cache.clear();
        session.session_id = Uuid::new_v4();
        ClearCommunicationsResult {
            success: true,
            cleared,
            old_session,
            new_session: session.session_id,
        }
    }

    /// The current session identifier, for UI display.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session.lock().unwrap_or_else(std::sync::PoisonError::into_inner).session_id
    }

    /// A snapshot of every entry currently in the communication log,
    /// backing the `GET /session/communications` endpoint.
    #[must_use]
    pub fn communications(&self) -> Vec<CommunicationEntry> {
        self.session.lock().unwrap_or_else(std::sync::PoisonError::into_inner).log.entries()
    }

    /// Purge cache entries across every registered agent
    /// `cache/purge` endpoint.
    pub async fn purge_cache(&self, software: Option<&SoftwareName>, version: Option<&SoftwareVersion>) -> u64 {
        let mut total = 0;
        for reg in &self.registrations {
            total += reg.agent.purge_cache(software, version).await.deleted_count;
        }
        total
    }
}

/// Invoke an agent, converting a panic at the call boundary into a failure
/// envelope instead of letting it escape to the caller
/// "agent-internal exceptions never escape to the orchestrator" rule.
async fn call_agent_safely(agent: &dyn EolAgent, software: &SoftwareName, version: Option<&SoftwareVersion>) -> EolEnvelope {
    use futures::FutureExt;

    let name = agent.name().to_string();
    let version_str = version_or_any(version);
    match std::panic::AssertUnwindSafe(agent.get_eol_data(software, version)).catch_unwind().await {
        Ok(envelope) => envelope,
        Err(_) => crate::agents::base::failure_envelope(
            &name,
            software.as_ref(),
            &version_str,
            crate::domain_types::ErrorCode::AgentException,
            format!("agent {name} panicked while handling this request"),
        ),
    }
}

fn process_envelope(envelope: EolEnvelope, confidence: f64) -> ProcessedData {
    let now = Utc::now();
    let (days_until_eol, status, risk_level) = match envelope.eol_date {
        Some(eol) => {
            let days = (eol - now).num_days();
            let (status, risk) = risk::status_and_risk(days);
            (Some(days), Some(status), Some(risk))
        }
        None => (None, None, None),
    };

    ProcessedData {
        software: envelope.software,
        version: envelope.version,
        eol_date: envelope.eol_date,
        support_end_date: envelope.support_end_date,
        release_date: envelope.release_date,
        confidence,
        source_url: envelope.source_url,
        data_source: envelope.data_source,
        additional_data: envelope.additional_data,
        days_until_eol,
        status,
        risk_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TieredCache;
    use crate::telemetry::TelemetryCollector;
    use std::time::Duration;

    fn test_orchestrator() -> Orchestrator {
        let cache = TieredCache::new(None, 30).shared();
        let telemetry = Arc::new(TelemetryCollector::new());
        Orchestrator::new(cache, telemetry, Duration::from_secs(5), Duration::from_secs(5), None)
    }

    #[tokio::test]
    async fn known_static_cycle_resolves_without_network() {
        let orchestrator = test_orchestrator();
        let software = SoftwareName::try_new("Ubuntu").unwrap();
        let version = SoftwareVersion::try_new("20.04").unwrap();

        let response = orchestrator.lookup(&software, Some(&version), Some("os"), false).await;

        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(response.agent_used, "ubuntu");
        assert_eq!(data.risk_level, Some("low"));
        assert!(!response.communications.is_empty());
    }

    #[tokio::test]
    async fn session_cache_serves_the_second_identical_lookup() {
        let orchestrator = test_orchestrator();
        let software = SoftwareName::try_new("Ubuntu").unwrap();
        let version = SoftwareVersion::try_new("20.04").unwrap();

        let first = orchestrator.lookup(&software, Some(&version), Some("os"), false).await;
        let second = orchestrator.lookup(&software, Some(&version), Some("os"), false).await;

        assert!(first.success && second.success);
        assert!(
            second
                .communications
                .iter()
                .any(|entry| entry.message.contains("Using cached decision"))
        );
    }

    #[tokio::test]
    async fn clear_communications_rotates_the_session_and_empties_the_log() {
        let orchestrator = test_orchestrator();
        let software = SoftwareName::try_new("Ubuntu").unwrap();
        orchestrator.lookup(&software, None, None, false).await;

        let before = orchestrator.session_id();
        let result = orchestrator.clear_communications();

        assert!(result.success);
        assert_eq!(result.old_session, before);
        assert_ne!(result.new_session, before);
        assert_eq!(orchestrator.session_id(), result.new_session);
    }

    #[tokio::test]
    async fn unrecognised_software_exhausts_every_candidate() {
        let orchestrator = test_orchestrator();
        let software = SoftwareName::try_new("SomeBespokeInternalTool").unwrap();

        let response = orchestrator.lookup(&software, None, None, false).await;

        assert!(!response.success);
        assert_eq!(response.agent_used, "orchestrator");
        assert!(response.error.is_some());
    }

    #[test]
    fn health_probe_reports_every_registered_agent() {
        let orchestrator = test_orchestrator();
        let snapshot = orchestrator.health();
        assert_eq!(snapshot.status, "ok");
        assert!(snapshot.agents.contains_key("ubuntu"));
        assert!(snapshot.agents.contains_key("fallback"));
        assert!(snapshot.agents.values().all(|ok| *ok));
    }

    #[tokio::test]
    async fn lookup_many_preserves_input_order() {
        let orchestrator = test_orchestrator();
        let targets = vec![
            (SoftwareName::try_new("Ubuntu").unwrap(), Some(SoftwareVersion::try_new("20.04").unwrap())),
            (SoftwareName::try_new("Windows Server 2012 R2").unwrap(), None),
        ];

        let responses = orchestrator.lookup_many(&targets, None, false).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].agent_used, "ubuntu");
        assert_eq!(responses[1].agent_used, "microsoft");
    }
}
