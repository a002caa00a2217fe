//! The generic vendor-agent engine: every vendor module in this directory
//! (Microsoft, Red Hat, Ubuntu, Apache, Node.js, Python, PHP, PostgreSQL,
//! Oracle, VMware) constructs one of these instead of hand-rolling the
//! cache → static table → scrape → failure algorithm itself. Composition
//! over inheritance: one engine struct instead of a base class.

use super::base::{envelope_from_cycle, envelope_from_parsed_cycle, no_data_found, StaticTable};
use super::{EolAgent, PurgeResult};
use crate::cache::TieredCache;
use crate::domain_types::{
    AgentUrl, ConfidenceScore, EolEnvelope, ParsedCycle, SoftwareName, SoftwareVersion,
};
use crate::telemetry::{RequestRecord, TelemetryCollector};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A page-specific parser: given the raw HTML body and an optional version
/// hint, return the best-matching cycle or `None`. Must never panic on
/// unexpected markup — parsers tolerate missing rows
pub type PageParser = dyn Fn(&str, Option<&SoftwareVersion>) -> Option<ParsedCycle> + Send + Sync;

/// The shared browser-class User-Agent string every outbound vendor
/// request uses
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// One vendor's instantiation of the shared agent engine.
pub struct VendorAgent {
    name: &'static str,
    keywords: &'static [&'static str],
    urls: Vec<AgentUrl>,
    table: StaticTable,
    cache: Arc<TieredCache>,
    telemetry: Arc<TelemetryCollector>,
    http: reqwest::Client,
    parser: Box<PageParser>,
}

impl VendorAgent {
    /// Construct a vendor agent engine.
    #[must_use]
    pub fn new(
        name: &'static str,
        keywords: &'static [&'static str],
        urls: Vec<AgentUrl>,
        table: StaticTable,
        cache: Arc<TieredCache>,
        telemetry: Arc<TelemetryCollector>,
        timeout: Duration,
        parser: Box<PageParser>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name,
            keywords,
            urls,
            table,
            cache,
            telemetry,
            http,
            parser,
        }
    }

    async fn scrape(&self, software: &SoftwareName, version: Option<&SoftwareVersion>) -> Option<EolEnvelope> {
        let mut active_urls: Vec<&AgentUrl> = self.urls.iter().filter(|u| u.active).collect();
        active_urls.sort_by_key(|u| u.priority);

        for url in active_urls {
            let started = Instant::now();
            let response = self.http.get(&url.url).send().await;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            let body = match response {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(text) => text,
                    Err(e) => {
                        self.telemetry.record_request(
                            RequestRecord::new(self.name, elapsed_ms)
                                .with_url(url.url.clone())
                                .with_error(true),
                        );
                        tracing::warn!(agent = self.name, url = %url.url, error = %e, "vendor scrape: body read failed");
                        continue;
                    }
                },
                Ok(resp) => {
                    self.telemetry.record_request(
                        RequestRecord::new(self.name, elapsed_ms)
                            .with_url(url.url.clone())
                            .with_error(true),
                    );
                    tracing::warn!(agent = self.name, url = %url.url, status = %resp.status(), "vendor scrape: non-2xx response");
                    continue;
                }
                Err(e) => {
                    self.telemetry.record_request(
                        RequestRecord::new(self.name, elapsed_ms)
                            .with_url(url.url.clone())
                            .with_error(true),
                    );
                    tracing::warn!(agent = self.name, url = %url.url, error = %e, "vendor scrape: request failed");
                    continue;
                }
            };

            if let Some(cycle) = (self.parser)(&body, version) {
                self.telemetry.record_request(
                    RequestRecord::new(self.name, elapsed_ms)
                        .with_url(url.url.clone())
                        .with_hit(false)
                        .with_records_extracted(1),
                );
                return Some(envelope_from_parsed_cycle(
                    self.name,
                    software.as_ref(),
                    version.map_or("any", SoftwareVersion::as_ref),
                    &cycle,
                    ConfidenceScore::clamp(0.8),
                    Some(url.url.clone()),
                ));
            }

            self.telemetry.record_request(
                RequestRecord::new(self.name, elapsed_ms)
                    .with_url(url.url.clone())
                    .with_hit(false),
            );
        }

        None
    }

    /// Download every listing page once and parse every cycle row, writing
    /// each into the cache — the orchestrator's periodic warming job. The
    /// default implementation here
    /// simply re-runs the single-cycle parser against the primary URL;
    /// agents whose upstream exposes a true multi-row listing override
    /// `bulk_parser` instead.
    pub async fn bulk_fetch(&self, bulk_parser: &dyn Fn(&str) -> Vec<ParsedCycle>) -> usize {
        let Some(primary) = self.urls.iter().filter(|u| u.active).min_by_key(|u| u.priority) else {
            return 0;
        };

        let started = Instant::now();
        let Ok(response) = self.http.get(&primary.url).send().await else {
            return 0;
        };
        let Ok(body) = response.text().await else {
            return 0;
        };

        let cycles = bulk_parser(&body);
        let count = cycles.len();

        for cycle in &cycles {
            let software = SoftwareName::try_new(self.name.to_string()).unwrap_or_else(|_| {
                SoftwareName::try_new("unknown".to_string()).expect("'unknown' is non-empty")
            });
            let envelope = envelope_from_parsed_cycle(
                self.name,
                self.name,
                &cycle.cycle,
                cycle,
                ConfidenceScore::clamp(0.8),
                Some(primary.url.clone()),
            );
            let version = SoftwareVersion::try_new(cycle.cycle.clone()).ok();
            self.cache
                .put(
                    &software,
                    version.as_ref(),
                    self.name,
                    envelope,
                    Some(primary.url.clone()),
                    false,
                    None,
                )
                .await;
        }

        self.telemetry.record_request(
            RequestRecord::new(self.name, started.elapsed().as_secs_f64() * 1000.0)
                .with_url(primary.url.clone())
                .with_records_extracted(count as u64),
        );

        count
    }
}

#[async_trait]
impl EolAgent for VendorAgent {
    fn name(&self) -> &str {
        self.name
    }

    fn is_relevant(&self, software: &SoftwareName) -> bool {
        let normalized = software.normalized();
        self.keywords.iter().any(|kw| normalized.contains(kw))
    }

    fn urls(&self) -> &[AgentUrl] {
        &self.urls
    }

    async fn get_eol_data(
        &self,
        software: &SoftwareName,
        version: Option<&SoftwareVersion>,
    ) -> EolEnvelope {
        let version_str = version.map_or("any", SoftwareVersion::as_ref).to_string();

        let started = Instant::now();
        if let Some(envelope) = self.cache.get(software, version, self.name).await {
            self.telemetry.record_request(
                RequestRecord::new(self.name, started.elapsed().as_secs_f64() * 1000.0)
                    .with_hit(true)
                    .with_query(software.as_ref(), Some(version_str)),
            );
            return envelope;
        }

        let static_started = Instant::now();
        if let Some(cycle) = self.table.find(software, version) {
            let envelope = envelope_from_cycle(
                self.name,
                software.as_ref(),
                &version_str,
                cycle,
                self.urls.first().map(|u| u.url.clone()),
            );
            self.cache
                .put(
                    software,
                    version,
                    self.name,
                    envelope.clone(),
                    self.urls.first().map(|u| u.url.clone()),
                    false,
                    None,
                )
                .await;
            self.telemetry.record_request(
                RequestRecord::new(self.name, static_started.elapsed().as_secs_f64() * 1000.0)
                    .with_hit(false)
                    .with_query(software.as_ref(), Some(version_str)),
            );
            return envelope;
        }

        if let Some(envelope) = self.scrape(software, version).await {
            self.cache
                .put(
                    software,
                    version,
                    self.name,
                    envelope.clone(),
                    envelope.source_url.clone(),
                    false,
                    None,
                )
                .await;
            return envelope;
        }

        no_data_found(self.name, software.as_ref(), &version_str)
    }

    async fn purge_cache(
        &self,
        software: Option<&SoftwareName>,
        _version: Option<&SoftwareVersion>,
    ) -> PurgeResult {
        let deleted = self
            .cache
            .purge(software.map(SoftwareName::as_ref), Some(self.name))
            .await;
        PurgeResult {
            success: true,
            deleted_count: deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::base::StaticTable;
    use crate::cache::TieredCache;
    use crate::telemetry::TelemetryCollector;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn agent(urls: Vec<AgentUrl>, parser: Box<PageParser>) -> VendorAgent {
        let cache = TieredCache::new(None, 30).shared();
        let telemetry = Arc::new(TelemetryCollector::new());
        VendorAgent::new(
            "testvendor",
            &["testvendor"],
            urls,
            StaticTable::new("testvendor", false, &[]),
            cache,
            telemetry,
            Duration::from_secs(5),
            parser,
        )
    }

    #[tokio::test]
    async fn get_eol_data_falls_through_to_scraping_a_live_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lifecycle"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<table><tr><td>9.9</td><td>2020-01-01</td><td>2021-01-01</td><td>2099-01-01</td></tr></table>"))
            .mount(&server)
            .await;

        let urls = vec![AgentUrl::new(&format!("{}/lifecycle", server.uri()), "test page", 1)];
        let parser: Box<PageParser> = Box::new(|body, _version| {
            if body.contains("9.9") {
                Some(ParsedCycle {
                    cycle: "9.9".to_string(),
                    release_date: Some("2020-01-01".to_string()),
                    support_end_date: Some("2021-01-01".to_string()),
                    eol_date: Some("2099-01-01".to_string()),
                    lts: false,
                })
            } else {
                None
            }
        });

        let agent = agent(urls, parser);
        let software = SoftwareName::try_new("TestVendor").unwrap();
        let envelope = agent.get_eol_data(&software, None).await;

        assert!(envelope.success);
        assert_eq!(envelope.data_source, crate::domain_types::DataSource::Scraped);
    }

    #[tokio::test]
    async fn get_eol_data_never_panics_on_malformed_upstream_markup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lifecycle"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not even close to html"))
            .mount(&server)
            .await;

        let urls = vec![AgentUrl::new(&format!("{}/lifecycle", server.uri()), "test page", 1)];
        let parser: Box<PageParser> = Box::new(|_body, _version| None);

        let agent = agent(urls, parser);
        let software = SoftwareName::try_new("TestVendor").unwrap();
        let envelope = agent.get_eol_data(&software, None).await;

        assert!(!envelope.success);
    }

    #[tokio::test]
    async fn bulk_fetch_writes_every_parsed_cycle_to_the_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lifecycle"))
            .respond_with(ResponseTemplate::new(200).set_body_string("two rows here"))
            .mount(&server)
            .await;

        let urls = vec![AgentUrl::new(&format!("{}/lifecycle", server.uri()), "test page", 1)];
        let parser: Box<PageParser> = Box::new(|_body, _version| None);
        let agent = agent(urls, parser);

        let bulk_parser = |_body: &str| {
            vec![
                ParsedCycle { cycle: "1.0".to_string(), release_date: None, support_end_date: None, eol_date: Some("2030-01-01".to_string()), lts: false },
                ParsedCycle { cycle: "2.0".to_string(), release_date: None, support_end_date: None, eol_date: Some("2031-01-01".to_string()), lts: false },
            ]
        };

        let count = agent.bulk_fetch(&bulk_parser).await;
        assert_eq!(count, 2);
    }
}
