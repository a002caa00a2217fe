//! The generic search-based fallback agent, used when no vendor agent
//! matched or the orchestrator runs in internet-only mode.
//!
//! Issues a plain HTTP search request via `reqwest` + `scraper` +
//! `html2text` rather than driving a headless browser (see DESIGN.md for
//! why), then runs challenge-page detection and date-extraction logic
//! against the returned HTML. The search/extract surface is small enough
//! that swapping in a real browser-automation backend later would not
//! change the orchestrator contract.

use super::base::{failure_envelope, success_envelope};
use super::{EolAgent, PurgeResult};
use crate::cache::TieredCache;
use crate::domain_types::{
    AgentUrl, ConfidenceScore, DataSource, EolEnvelope, ErrorCode, SoftwareName, SoftwareVersion, version_or_any,
};
use crate::telemetry::{RequestRecord, TelemetryCollector};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Body substrings that indicate a bot-challenge page rather than real content.
const CHALLENGE_PHRASES: &[&str] = &["one last step", "just a moment", "checking your browser"];

/// How a matched date relates to the surrounding lifecycle language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateRole {
    Eol,
    SupportEnd,
    Release,
}

/// The confidence tier of a single date match table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Tier {
    fn confidence(self) -> f64 {
        match self {
            Tier::VeryHigh => 0.95,
            Tier::High => 0.85,
            Tier::Medium => 0.70,
            Tier::Low => 0.50,
        }
    }

    fn downgrade(self) -> Tier {
        match self {
            Tier::VeryHigh => Tier::High,
            Tier::High => Tier::Medium,
            Tier::Medium | Tier::Low => Tier::Low,
        }
    }
}

struct DateMatch {
    role: DateRole,
    tier: Tier,
    parsed: DateTime<Utc>,
}

static NATURAL_LONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}\s+[A-Z][a-z]+\s+\d{4}\b").expect("valid regex"));
static NATURAL_SHORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+\s+\d{1,2},?\s+\d{4}\b").expect("valid regex"));
static NUMERIC_ISO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("valid regex"));
static NUMERIC_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b").expect("valid regex"));

static EOL_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(end[- ]of[- ]life|\beol\b|support ends?|extended support|retirement|deprecated|sunset)")
        .expect("valid regex")
});
static SUPPORT_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(end of support|support ends?|mainstream support|extended support ends)").expect("valid regex")
});
static RELEASE_KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(release|released|\bga\b|general availability|shipped|launched)").expect("valid regex"));

const CONTEXT_RADIUS: usize = 100;

fn context_window(text: &str, start: usize, end: usize) -> &str {
    let from = start.saturating_sub(CONTEXT_RADIUS);
    let to = (end + CONTEXT_RADIUS).min(text.len());
    // Regex matches are on char boundaries for our ASCII-safe patterns; text
    // may still contain multi-byte content outside the match, so clamp to
    // the nearest valid boundary rather than panicking.
    let mut from = from;
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = to;
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }
    &text[from..to]
}

fn classify(text: &str, start: usize, end: usize, format_tier: Tier) -> (DateRole, Tier) {
    let window = context_window(text, start, end);
    let has_eol = EOL_KEYWORDS.is_match(window);
    let has_support = SUPPORT_KEYWORDS.is_match(window);
    let has_release = RELEASE_KEYWORDS.is_match(window);

    if has_eol {
        return (DateRole::Eol, Tier::VeryHigh);
    }
    if has_support {
        let tier = if has_release { format_tier.downgrade() } else { format_tier };
        return (DateRole::SupportEnd, tier);
    }
    if has_release {
        return (DateRole::Release, format_tier);
    }
    (DateRole::Eol, format_tier)
}

fn find_date_matches(text: &str) -> Vec<DateMatch> {
    let mut matches = Vec::new();

    for (pattern, tier) in [
        (&*NATURAL_LONG, Tier::High),
        (&*NATURAL_SHORT, Tier::High),
        (&*NUMERIC_ISO, Tier::Medium),
        (&*NUMERIC_SLASH, Tier::Medium),
    ] {
        for m in pattern.find_iter(text) {
            let Some(parsed) = super::base::parse_flexible_date(m.as_str()) else {
                continue;
            };
            let (role, tier) = classify(text, m.start(), m.end(), tier);
            matches.push(DateMatch { role, tier, parsed });
        }
    }

    matches
}

/// A date the LLM-assisted extraction path returned for one lifecycle field.
#[derive(Debug, Deserialize)]
struct LlmDateField {
    date: Option<String>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LlmExtraction {
    eol_date: Option<LlmDateField>,
    support_end_date: Option<LlmDateField>,
    release_date: Option<LlmDateField>,
}

/// Azure-OpenAI-shaped configuration for the optional LLM-assisted
/// date-extraction path last paragraph. Narrowed from
/// the source's full assistant orchestrator to just this one extraction call.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base endpoint URL.
    pub endpoint: String,
    /// Deployment/model name.
    pub deployment: String,
    /// API version query parameter.
    pub api_version: String,
}

/// The generic, vendor-agnostic search-and-extract fallback agent.
pub struct FallbackAgent {
    urls: Vec<AgentUrl>,
    cache: Arc<TieredCache>,
    telemetry: Arc<TelemetryCollector>,
    http: reqwest::Client,
    llm: Option<LlmConfig>,
}

impl FallbackAgent {
    /// Build the fallback agent. `llm` is `None` unless
    /// `AppConfig::llm_configured()` is true at startup.
    #[must_use]
    pub fn new(
        cache: Arc<TieredCache>,
        telemetry: Arc<TelemetryCollector>,
        timeout: Duration,
        llm: Option<LlmConfig>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(super::vendor::BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            urls: vec![AgentUrl::new(SEARCH_ENDPOINT, "Web search fallback", 1)],
            cache,
            telemetry,
            http,
            llm,
        }
    }

    fn build_query(software: &SoftwareName, version: Option<&SoftwareVersion>) -> String {
        let version_part = version.map(SoftwareVersion::as_ref);
        match version_part {
            Some(v) => format!("{} {v} end of life date", software.as_ref()),
            None => format!("{} end of life date", software.as_ref()),
        }
    }

    fn is_challenge_page(body: &str) -> bool {
        let lower = body.to_lowercase();
        CHALLENGE_PHRASES.iter().any(|phrase| lower.contains(phrase))
    }

    /// Pull the top-ranked result snippet out of a search results page,
    /// falling back through a fixed selector list.
    fn extract_result_text(html: &str) -> String {
        const SELECTORS: &[&str] = &[
            ".result__snippet",
            ".result__body",
            "#links .result",
            "body",
        ];

        for selector in SELECTORS {
            let Ok(sel) = scraper::Selector::parse(selector) else {
                continue;
            };
            let document = scraper::Html::parse_document(html);
            let text: String = document
                .select(&sel)
                .take(3)
                .map(|el| el.text().collect::<Vec<_>>().join(" "))
                .collect::<Vec<_>>()
                .join(" ");
            let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.chars().count() >= 100 {
                return collapsed;
            }
        }

        html2text::from_read(html.as_bytes(), 2000)
    }

    async fn llm_fill_gaps(
        &self,
        text: &str,
        eol: &mut Option<(DateTime<Utc>, f64)>,
        support_end: &mut Option<(DateTime<Utc>, f64)>,
        release: &mut Option<(DateTime<Utc>, f64)>,
    ) {
        let Some(llm) = &self.llm else {
            return;
        };
        if eol.is_some() {
            return;
        }

        let excerpt: String = text.chars().take(6000).collect();
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            llm.endpoint.trim_end_matches('/'),
            llm.deployment,
            llm.api_version
        );
        let prompt = format!(
            "Extract end-of-life, support-end, and release dates as JSON with \
             {{eol_date:{{date,confidence}},support_end_date:{{date,confidence}},\
             release_date:{{date,confidence}}}} from:\n{excerpt}"
        );
        let body = serde_json::json!({
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
        });

        let Ok(response) = self.http.post(&url).json(&body).send().await else {
            return;
        };
        let Ok(raw): Result<serde_json::Value, _> = response.json().await else {
            return;
        };
        let Some(content) = raw
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
        else {
            return;
        };
        let Ok(extraction) = serde_json::from_str::<LlmExtraction>(content) else {
            return;
        };

        if let Some(field) = extraction.eol_date
            && let Some(date) = field.date.as_deref().and_then(super::base::parse_flexible_date)
        {
            *eol = Some((date, field.confidence.unwrap_or(0.7)));
        }
        if let Some(field) = extraction.support_end_date
            && let Some(date) = field.date.as_deref().and_then(super::base::parse_flexible_date)
        {
            support_end.get_or_insert((date, field.confidence.unwrap_or(0.7)));
        }
        if let Some(field) = extraction.release_date
            && let Some(date) = field.date.as_deref().and_then(super::base::parse_flexible_date)
        {
            release.get_or_insert((date, field.confidence.unwrap_or(0.7)));
        }
    }
}

#[async_trait]
impl EolAgent for FallbackAgent {
    fn name(&self) -> &str {
        "fallback"
    }

    fn is_relevant(&self, _software: &SoftwareName) -> bool {
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

        let query = Self::build_query(software, version);
        let fetch_started = Instant::now();

        let response = match self.http.get(SEARCH_ENDPOINT).query(&[("q", query.as_str())]).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            _ => {
                self.telemetry.record_request(
                    RequestRecord::new(self.name(), fetch_started.elapsed().as_secs_f64() * 1000.0)
                        .with_url(SEARCH_ENDPOINT.to_string())
                        .with_error(true),
                );
                return failure_envelope(
                    self.name(),
                    software.as_ref(),
                    &version_str,
                    ErrorCode::ScrapeFailed,
                    "web search request failed",
                );
            }
        };

        let Ok(body) = response.text().await else {
            return failure_envelope(
                self.name(),
                software.as_ref(),
                &version_str,
                ErrorCode::ScrapeFailed,
                "failed to read search response body",
            );
        };

        if Self::is_challenge_page(&body) {
            self.telemetry.record_request(
                RequestRecord::new(self.name(), fetch_started.elapsed().as_secs_f64() * 1000.0)
                    .with_url(SEARCH_ENDPOINT.to_string())
                    .with_error(true),
            );
            return failure_envelope(
                self.name(),
                software.as_ref(),
                &version_str,
                ErrorCode::CloudflareBlocked,
                "search results were gated behind a bot challenge page",
            );
        }

        let text = Self::extract_result_text(&body);
        let matches = find_date_matches(&text);

        let mut eol: Option<(DateTime<Utc>, f64)> = None;
        let mut support_end: Option<(DateTime<Utc>, f64)> = None;
        let mut release: Option<(DateTime<Utc>, f64)> = None;

        for m in matches {
            let confidence = m.tier.confidence();
            match m.role {
                DateRole::Eol if eol.is_none_or(|(_, c)| confidence > c) => eol = Some((m.parsed, confidence)),
                DateRole::SupportEnd if support_end.is_none_or(|(_, c)| confidence > c) => {
                    support_end = Some((m.parsed, confidence));
                }
                DateRole::Release if release.is_none_or(|(_, c)| confidence > c) => release = Some((m.parsed, confidence)),
                _ => {}
            }
        }

        self.llm_fill_gaps(&text, &mut eol, &mut support_end, &mut release).await;

        if eol.is_none() && support_end.is_none() && release.is_none() {
            self.telemetry.record_request(
                RequestRecord::new(self.name(), fetch_started.elapsed().as_secs_f64() * 1000.0)
                    .with_url(SEARCH_ENDPOINT.to_string())
                    .with_hit(false),
            );
            return failure_envelope(
                self.name(),
                software.as_ref(),
                &version_str,
                ErrorCode::NoEolDateFound,
                format!("no lifecycle date found on search results for {query}"),
            );
        }

        let confidence = eol
            .map(|(_, c)| c)
            .or(support_end.map(|(_, c)| c))
            .unwrap_or(0.5)
            .min(0.95);

        let mut envelope = success_envelope(
            self.name(),
            software.as_ref(),
            &version_str,
            eol.map(|(d, _)| d),
            support_end.map(|(d, _)| d),
            release.map(|(d, _)| d),
            ConfidenceScore::clamp(confidence),
            Some(SEARCH_ENDPOINT.to_string()),
            DataSource::Scraped,
        );
        envelope.additional_data.insert(
            "evidence_snippet".to_string(),
            serde_json::json!(text.chars().take(200).collect::<String>()),
        );

        self.cache
            .put(
                software,
                version,
                self.name(),
                envelope.clone(),
                Some(SEARCH_ENDPOINT.to_string()),
                false,
                None,
            )
            .await;

        self.telemetry.record_request(
            RequestRecord::new(self.name(), fetch_started.elapsed().as_secs_f64() * 1000.0)
                .with_url(SEARCH_ENDPOINT.to_string())
                .with_hit(false)
                .with_records_extracted(1),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_page_is_detected_case_insensitively() {
        assert!(FallbackAgent::is_challenge_page("Please wait... Just a Moment while we verify you"));
        assert!(!FallbackAgent::is_challenge_page("Ubuntu 20.04 reaches end of life on 2025-04-23"));
    }

    #[test]
    fn eol_keyword_elevates_date_to_very_high_tier() {
        let text = "Ubuntu 20.04 end of life is 2025-04-23 according to the release notes.";
        let matches = find_date_matches(text);
        let eol_match = matches.iter().find(|m| m.role == DateRole::Eol).expect("an eol match");
        assert_eq!(eol_match.tier, Tier::VeryHigh);
    }

    #[test]
    fn release_only_date_is_not_returned_as_eol() {
        let text = "Windows Server 2022 was released on 2021-08-18 for general availability.";
        let matches = find_date_matches(text);
        assert!(matches.iter().all(|m| m.role != DateRole::Eol || EOL_KEYWORDS.is_match(text)));
        assert!(matches.iter().any(|m| m.role == DateRole::Release));
    }

    #[test]
    fn search_query_includes_version_when_present() {
        let software = SoftwareName::try_new("Ubuntu").unwrap();
        let version = SoftwareVersion::try_new("20.04").unwrap();
        let query = FallbackAgent::build_query(&software, Some(&version));
        assert!(query.contains("20.04"));
        assert!(query.contains("end of life date"));
    }
}
