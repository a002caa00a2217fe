//! PostgreSQL vendor agent.
//!
//! PostgreSQL versions at major granularity (14, 15, 16, 17).

use super::base::{StaticTable, scrape_table_rows};
use super::vendor::VendorAgent;
use crate::cache::TieredCache;
use crate::domain_types::{AgentUrl, ParsedCycle, StaticCycle};
use crate::telemetry::TelemetryCollector;
use std::sync::Arc;
use std::time::Duration;

/// Relevance keywords.
pub const KEYWORDS: &[&str] = &["postgresql", "postgres", "pgsql"];

const TABLE: &[(&str, StaticCycle)] = &[
    (
        "postgresql-14",
        StaticCycle {
            cycle: "14",
            release_date: Some("2021-09-30"),
            support_end_date: None,
            eol_date: Some("2026-11-12"),
            lts: false,
        },
    ),
    (
        "postgresql-15",
        StaticCycle {
            cycle: "15",
            release_date: Some("2022-10-13"),
            support_end_date: None,
            eol_date: Some("2027-11-11"),
            lts: false,
        },
    ),
    (
        "postgresql-16",
        StaticCycle {
            cycle: "16",
            release_date: Some("2023-09-14"),
            support_end_date: None,
            eol_date: Some("2028-11-09"),
            lts: false,
        },
    ),
    (
        "postgresql-17",
        StaticCycle {
            cycle: "17",
            release_date: Some("2024-09-26"),
            support_end_date: None,
            eol_date: Some("2029-11-08"),
            lts: false,
        },
    ),
];

fn parser(html: &str, version_hint: Option<&crate::domain_types::SoftwareVersion>) -> Option<ParsedCycle> {
    let rows = scrape_table_rows(html, "table tbody tr", "td");
    let version_slice = version_hint.map(crate::domain_types::SoftwareVersion::major);

    rows.into_iter().find_map(|cells| {
        if cells.len() < 3 {
            return None;
        }
        let cycle = cells.first()?.clone();
        if let Some(needle) = version_slice
            && !cycle.contains(needle)
        {
            return None;
        }
        Some(ParsedCycle {
            cycle,
            release_date: cells.get(1).cloned(),
            support_end_date: None,
            eol_date: cells.get(2).cloned(),
            lts: false,
        })
    })
}

/// Build the PostgreSQL vendor agent.
#[must_use]
pub fn build(cache: Arc<TieredCache>, telemetry: Arc<TelemetryCollector>, timeout: Duration) -> VendorAgent {
    let urls = vec![
        AgentUrl::new("https://www.postgresql.org/support/versioning/", "PostgreSQL versioning policy", 1),
        AgentUrl::new("https://endoflife.date/postgresql", "PostgreSQL EOL schedule", 2),
    ];

    VendorAgent::new(
        "postgresql",
        KEYWORDS,
        urls,
        StaticTable::new("postgresql", true, TABLE),
        cache,
        telemetry,
        timeout,
        Box::new(parser),
    )
}
