//! The generic, vendor-agnostic `endoflife.date` agent.
//!
//! A thin JSON client over the public `endoflife.date` API, appended as
//! the last-resort vendor-agnostic source to every routing candidate list.
//! Unlike the HTML-scraping vendor agents this one speaks JSON directly,
//! so it implements `EolAgent` on its own rather than going through
//! `vendor::VendorAgent`.

use super::base::{failure_envelope, no_data_found, parse_flexible_date, success_envelope};
use super::{EolAgent, PurgeResult};
use crate::cache::TieredCache;
use crate::domain_types::{
    AgentUrl, ConfidenceScore, DataSource, EolEnvelope, ErrorCode, SoftwareName, SoftwareVersion, version_or_any,
};
use crate::telemetry::{RequestRecord, TelemetryCollector};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

const API_BASE: &str = "https://endoflife.date/api";

/// One product's cycle row, as returned by the `endoflife.date` JSON API.
#[derive(Debug, Deserialize)]
struct ApiCycle {
    cycle: serde_json::Value,
    #[serde(rename = "releaseDate")]
    release_date: Option<String>,
    eol: Option<EolField>,
    support: Option<EolField>,
    lts: Option<LtsField>,
}

/// The `eol`/`support` fields are either a boolean (`false`) or a date string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EolField {
    Flag(bool),
    Date(String),
}

impl EolField {
    fn as_date(&self) -> Option<&str> {
        match self {
            Self::Flag(_) => None,
            Self::Date(date) => Some(date),
        }
    }
}

/// The `lts` field is either a boolean or an LTS-start date string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LtsField {
    Flag(bool),
    Date(String),
}

impl LtsField {
    fn as_bool(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Date(_) => true,
        }
    }
}

/// The generic `endoflife.date` vendor-agnostic agent.
pub struct EndOfLifeAgent {
    urls: Vec<AgentUrl>,
    cache: Arc<TieredCache>,
    telemetry: Arc<TelemetryCollector>,
    http: reqwest::Client,
}

impl EndOfLifeAgent {
    /// Build the generic `endoflife.date` agent.
    #[must_use]
    pub fn new(cache: Arc<TieredCache>, telemetry: Arc<TelemetryCollector>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(super::vendor::BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            urls: vec![AgentUrl::new(
                "https://endoflife.date/api",
                "endoflife.date public JSON API",
                1,
            )],
            cache,
            telemetry,
            http,
        }
    }

    fn product_slug(software: &SoftwareName) -> String {
        software
            .normalized()
            .chars()
            .map(|c| if c.is_whitespace() || c == '_' { '-' } else { c })
            .collect()
    }

    fn best_cycle<'a>(cycles: &'a [ApiCycle], version: Option<&SoftwareVersion>) -> Option<&'a ApiCycle> {
        let Some(version) = version else {
            return cycles.first();
        };
        let version_slice = if version.as_ref().split('.').count() == 1 {
            version.major().to_string()
        } else {
            version.major_minor()
        };

        cycles.iter().find(|row| {
            let cycle_label = match &row.cycle {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            cycle_label.contains(&version_slice) || version_slice.contains(&cycle_label)
        })
    }
}

#[async_trait]
impl EolAgent for EndOfLifeAgent {
    fn name(&self) -> &str {
        "endoflife"
    }

    fn is_relevant(&self, _software: &SoftwareName) -> bool {
        // Vendor-agnostic: always a candidate, appended last.
        true
    }

    fn urls(&self) -> &[AgentUrl] {
        &self.urls
    }

    async fn get_eol_data(&self, software: &SoftwareName, version: Option<&SoftwareVersion>) -> EolEnvelope {
        let version_str = version_or_any(version);
        let started = Instant::now();

        if let Some(envelope) = self.cache.get(software, version, self.name()).await {
            self.telemetry.record_request(
                RequestRecord::new(self.name(), started.elapsed().as_secs_f64() * 1000.0).with_hit(true),
            );
            return envelope;
        }

        let slug = Self::product_slug(software);
        let url = format!("{API_BASE}/{slug}.json");
        let fetch_started = Instant::now();

        let response = match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                self.telemetry.record_request(
                    RequestRecord::new(self.name(), fetch_started.elapsed().as_secs_f64() * 1000.0)
                        .with_url(url.clone())
                        .with_error(true),
                );
                return failure_envelope(
                    self.name(),
                    software.as_ref(),
                    &version_str,
                    ErrorCode::ScrapeFailed,
                    format!("endoflife.date returned {} for {url}", resp.status()),
                );
            }
            Err(e) => {
                self.telemetry.record_request(
                    RequestRecord::new(self.name(), fetch_started.elapsed().as_secs_f64() * 1000.0)
                        .with_url(url.clone())
                        .with_error(true),
                );
                return failure_envelope(
                    self.name(),
                    software.as_ref(),
                    &version_str,
                    ErrorCode::ScrapeFailed,
                    format!("request to {url} failed: {e}"),
                );
            }
        };

        let cycles: Vec<ApiCycle> = match response.json().await {
            Ok(cycles) => cycles,
            Err(_) => return no_data_found(self.name(), software.as_ref(), &version_str),
        };

        let Some(cycle) = Self::best_cycle(&cycles, version) else {
            self.telemetry.record_request(
                RequestRecord::new(self.name(), fetch_started.elapsed().as_secs_f64() * 1000.0)
                    .with_url(url.clone())
                    .with_hit(false),
            );
            return no_data_found(self.name(), software.as_ref(), &version_str);
        };

        let cycle_label = match &cycle.cycle {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        let mut envelope = success_envelope(
            self.name(),
            software.as_ref(),
            &cycle_label,
            cycle.eol.as_ref().and_then(EolField::as_date).and_then(parse_flexible_date),
            cycle.support.as_ref().and_then(EolField::as_date).and_then(parse_flexible_date),
            cycle.release_date.as_deref().and_then(parse_flexible_date),
            ConfidenceScore::clamp(0.85),
            Some(url.clone()),
            DataSource::Scraped,
        );
        envelope.additional_data.insert("cycle".to_string(), serde_json::json!(cycle_label));
        envelope.additional_data.insert(
            "lts".to_string(),
            serde_json::json!(cycle.lts.as_ref().is_some_and(LtsField::as_bool)),
        );

        self.cache
            .put(software, version, self.name(), envelope.clone(), Some(url.clone()), false, None)
            .await;

        self.telemetry.record_request(
            RequestRecord::new(self.name(), fetch_started.elapsed().as_secs_f64() * 1000.0)
                .with_url(url)
                .with_hit(false),
        );

        envelope
    }

    async fn purge_cache(&self, software: Option<&SoftwareName>, _version: Option<&SoftwareVersion>) -> PurgeResult {
        let deleted = self.cache.purge(software.map(SoftwareName::as_ref), Some(self.name())).await;
        PurgeResult {
            success: true,
            deleted_count: deleted,
        }
    }
}
