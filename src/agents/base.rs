//! Shared envelope builders and the static-table matching algorithm every
//! vendor agent reuses. Rust has no inheritance, so the "shared base"
//! pattern becomes a free-function toolkit plus a `StaticTable` helper
//! struct every vendor agent holds.

use crate::domain_types::{
    ConfidenceScore, DataSource, EnvelopeError, EolEnvelope, ErrorCode, ParsedCycle, SoftwareName,
    SoftwareVersion, StaticCycle,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use scraper::{Html, Selector};
use std::collections::HashMap;

/// Parse every row of the first table matching `row_selector` into a grid
/// of per-cell text, trimmed and whitespace-collapsed. Used by vendor page
/// parsers that lay lifecycle data out as an HTML table (Ubuntu, Node.js,
/// PostgreSQL, PHP, …). Never panics: an unparseable selector or absent
/// table yields an empty grid so the caller's fallback chain proceeds.
#[must_use]
pub fn scrape_table_rows(html: &str, row_selector: &str, cell_selector: &str) -> Vec<Vec<String>> {
    let Ok(row_sel) = Selector::parse(row_selector) else {
        return Vec::new();
    };
    let Ok(cell_sel) = Selector::parse(cell_selector) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&row_sel)
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| cell.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
                .collect::<Vec<String>>()
        })
        .filter(|row| !row.is_empty())
        .collect()
}

/// Build a success envelope. At least one lifecycle date must be supplied
/// or the envelope invariant is violated — callers are trusted to respect
/// this since every caller in this crate is internal.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn success_envelope(
    agent: &str,
    software: &str,
    version: &str,
    eol_date: Option<DateTime<Utc>>,
    support_end_date: Option<DateTime<Utc>>,
    release_date: Option<DateTime<Utc>>,
    confidence: ConfidenceScore,
    source_url: Option<String>,
    data_source: DataSource,
) -> EolEnvelope {
    EolEnvelope {
        success: true,
        software: software.to_string(),
        version: version.to_string(),
        eol_date,
        support_end_date,
        release_date,
        confidence,
        source_url,
        agent_used: agent.to_string(),
        data_source,
        additional_data: HashMap::new(),
        error: None,
    }
}

/// Build a failure envelope with the given error code and message.
#[must_use]
pub fn failure_envelope(
    agent: &str,
    software: &str,
    version: &str,
    code: ErrorCode,
    message: impl Into<String>,
) -> EolEnvelope {
    EolEnvelope {
        success: false,
        software: software.to_string(),
        version: version.to_string(),
        eol_date: None,
        support_end_date: None,
        release_date: None,
        confidence: ConfidenceScore::zero(),
        source_url: None,
        agent_used: agent.to_string(),
        data_source: DataSource::Static,
        additional_data: HashMap::new(),
        error: Some(EnvelopeError {
            message: message.into(),
            code,
        }),
    }
}

/// The canonical "no data found" failure envelope every agent returns on a
/// total miss.
#[must_use]
pub fn no_data_found(agent: &str, software: &str, version: &str) -> EolEnvelope {
    failure_envelope(
        agent,
        software,
        version,
        ErrorCode::NoDataFound,
        format!("no EOL data found for {software} {version}"),
    )
}

/// Parse a date string in one of the formats vendor parsers need to
/// tolerate: `YYYY-MM-DD`, `"25 April 2024"`, `"April 25, 2024"`, a bare
/// year (→ January 1st), or `"Oct 2024"` (→ last day of month).
/// Never panics; returns `None` on anything unrecognized so the fallback
/// chain can proceed.
#[must_use]
pub fn parse_flexible_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return to_utc_midnight(date);
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%d %B %Y") {
        return to_utc_midnight(date);
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%B %d, %Y") {
        return to_utc_midnight(date);
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%B %d %Y") {
        return to_utc_midnight(date);
    }

    if let Ok(year) = input.parse::<i32>()
        && (1990..=2100).contains(&year)
    {
        return to_utc_midnight(NaiveDate::from_ymd_opt(year, 1, 1)?);
    }

    if let Some(date) = parse_month_year(input) {
        return to_utc_midnight(last_day_of_month(date));
    }

    None
}

fn to_utc_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
}

fn parse_month_year(input: &str) -> Option<NaiveDate> {
    for fmt in ["%b %Y", "%B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{input} 01"), &format!("{fmt} %d")) {
            return Some(date);
        }
    }
    None
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = (date.year(), date.month());
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next_month_first
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

use chrono::Datelike;

/// A vendor's static table of well-known product cycles, plus the matching
/// rules: exact key match, version-specific synthetic key, vendor-token
/// partial match, and a last-resort generic partial match.
pub struct StaticTable {
    /// The vendor token used to build synthetic keys and to gate partial matches.
    vendor: &'static str,
    /// Whether this vendor versions at major granularity (e.g. Tomcat's
    /// synthetic key is `"tomcat-10"` rather than `"tomcat-10.1"`).
    major_granularity: bool,
    entries: &'static [(&'static str, StaticCycle)],
}

fn dash_normalize(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_whitespace() || c == '_' || c == '.' { '-' } else { c })
        .collect::<String>()
        .to_lowercase()
}

impl StaticTable {
    /// Construct a static table for `vendor` from a fixed list of entries.
    #[must_use]
    pub const fn new(
        vendor: &'static str,
        major_granularity: bool,
        entries: &'static [(&'static str, StaticCycle)],
    ) -> Self {
        Self {
            vendor,
            major_granularity,
            entries,
        }
    }

    /// Find the best-matching cycle for `software`/`version`, per the
    /// four-rule precedence documented above.
    #[must_use]
    pub fn find(&self, software: &SoftwareName, version: Option<&SoftwareVersion>) -> Option<&'static StaticCycle> {
        let normalized_software = dash_normalize(software.as_ref());

        // Rule 1: exact key match.
        if let Some((_, cycle)) = self
            .entries
            .iter()
            .find(|(key, _)| *key == normalized_software)
        {
            return Some(cycle);
        }

        // Rule 2: version-specific synthetic key.
        if let Some(version) = version {
            let version_slice = if self.major_granularity {
                version.major().to_string()
            } else {
                version.major_minor()
            };
            let synthetic_key = format!("{}-{}", self.vendor, version_slice);
            if let Some((_, cycle)) = self.entries.iter().find(|(key, _)| *key == synthetic_key) {
                return Some(cycle);
            }
        }

        // Rule 3: partial match requiring the vendor token in both query and key.
        if normalized_software.contains(self.vendor) {
            let candidates: Vec<&(&'static str, StaticCycle)> = self
                .entries
                .iter()
                .filter(|(key, _)| key.contains(self.vendor))
                .collect();
            if let Some(found) = Self::best_version_match(&candidates, version) {
                return Some(found);
            }
        }

        // Rule 4: generic partial match, last resort, still version-gated if supplied.
        let candidates: Vec<&(&'static str, StaticCycle)> = self
            .entries
            .iter()
            .filter(|(key, _)| key.contains(&normalized_software) || normalized_software.contains(*key))
            .collect();
        Self::best_version_match(&candidates, version)
    }

    fn best_version_match(
        candidates: &[&(&'static str, StaticCycle)],
        version: Option<&SoftwareVersion>,
    ) -> Option<&'static StaticCycle> {
        let Some(version) = version else {
            return candidates.first().map(|(_, cycle)| cycle);
        };

        let version_slice = if version.as_ref().split('.').count() == 1 {
            version.major().to_string()
        } else {
            version.major_minor()
        };

        candidates
            .iter()
            .find(|(_, cycle)| {
                cycle.cycle.contains(&version_slice) || version_slice.contains(cycle.cycle)
            })
            .map(|(_, cycle)| cycle)
    }
}

/// Convert a `StaticCycle`'s string dates into an envelope
/// step 2: confidence ~0.9, `DataSource::Static`.
#[must_use]
pub fn envelope_from_cycle(
    agent: &str,
    software: &str,
    version: &str,
    cycle: &StaticCycle,
    source_url: Option<String>,
) -> EolEnvelope {
    let mut envelope = success_envelope(
        agent,
        software,
        version,
        cycle.eol_date.and_then(parse_flexible_date),
        cycle.support_end_date.and_then(parse_flexible_date),
        cycle.release_date.and_then(parse_flexible_date),
        ConfidenceScore::clamp(0.9),
        source_url,
        DataSource::Static,
    );
    envelope
        .additional_data
        .insert("cycle".to_string(), serde_json::json!(cycle.cycle));
    envelope
        .additional_data
        .insert("lts".to_string(), serde_json::json!(cycle.lts));
    envelope
}

/// Convert a scraped `ParsedCycle` into an envelope step 3:
/// confidence 0.75-0.85, `DataSource::Scraped`.
#[must_use]
pub fn envelope_from_parsed_cycle(
    agent: &str,
    software: &str,
    version: &str,
    cycle: &ParsedCycle,
    confidence: ConfidenceScore,
    source_url: Option<String>,
) -> EolEnvelope {
    let mut envelope = success_envelope(
        agent,
        software,
        version,
        cycle.eol_date.as_deref().and_then(parse_flexible_date),
        cycle.support_end_date.as_deref().and_then(parse_flexible_date),
        cycle.release_date.as_deref().and_then(parse_flexible_date),
        confidence,
        source_url,
        DataSource::Scraped,
    );
    envelope
        .additional_data
        .insert("cycle".to_string(), serde_json::json!(cycle.cycle));
    envelope
        .additional_data
        .insert("lts".to_string(), serde_json::json!(cycle.lts));
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOMCAT_TABLE: &[(&str, StaticCycle)] = &[
        (
            "tomcat-10",
            StaticCycle {
                cycle: "10.1",
                release_date: Some("2022-09-29"),
                support_end_date: None,
                eol_date: Some("2027-12-31"),
                lts: false,
            },
        ),
        (
            "tomcat-9",
            StaticCycle {
                cycle: "9.0",
                release_date: Some("2017-12-22"),
                support_end_date: None,
                eol_date: Some("2027-12-31"),
                lts: false,
            },
        ),
    ];

    #[test]
    fn synthetic_key_matches_on_major_granularity() {
        let table = StaticTable::new("tomcat", true, TOMCAT_TABLE);
        let software = SoftwareName::try_new("Apache Tomcat").unwrap();
        let version = SoftwareVersion::try_new("10.1.16").unwrap();
        let cycle = table.find(&software, Some(&version)).unwrap();
        assert_eq!(cycle.cycle, "10.1");
    }

    #[test]
    fn no_match_returns_none_rather_than_panicking() {
        let table = StaticTable::new("tomcat", true, TOMCAT_TABLE);
        let software = SoftwareName::try_new("SomeUnrelatedThing").unwrap();
        assert!(table.find(&software, None).is_none());
    }

    #[test]
    fn flexible_date_parses_every_documented_format() {
        assert!(parse_flexible_date("2024-04-25").is_some());
        assert!(parse_flexible_date("25 April 2024").is_some());
        assert!(parse_flexible_date("April 25, 2024").is_some());
        assert_eq!(
            parse_flexible_date("2024").unwrap().format("%m-%d").to_string(),
            "01-01"
        );
        let oct = parse_flexible_date("Oct 2024").unwrap();
        assert_eq!(oct.format("%Y-%m-%d").to_string(), "2024-10-31");
    }

    #[test]
    fn flexible_date_returns_none_for_garbage() {
        assert!(parse_flexible_date("not a date").is_none());
        assert!(parse_flexible_date("").is_none());
    }
}
