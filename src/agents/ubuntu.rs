//! Ubuntu/Debian vendor agent.
//!
//! Ubuntu versions at major.minor granularity (`20.04`, `22.04`, …). Also
//! exposes a bulk-fetch parser for the releases listing page.

use super::base::{StaticTable, scrape_table_rows};
use super::vendor::VendorAgent;
use crate::cache::TieredCache;
use crate::domain_types::{AgentUrl, ParsedCycle, StaticCycle};
use crate::telemetry::TelemetryCollector;
use std::sync::Arc;
use std::time::Duration;

/// Relevance keywords.
pub const KEYWORDS: &[&str] = &["ubuntu", "debian"];

const TABLE: &[(&str, StaticCycle)] = &[
    (
        "ubuntu-18.04",
        StaticCycle {
            cycle: "18.04 LTS",
            release_date: Some("2018-04-26"),
            support_end_date: Some("2023-04-26"),
            eol_date: Some("2028-04-26"),
            lts: true,
        },
    ),
    (
        "ubuntu-20.04",
        StaticCycle {
            cycle: "20.04 LTS",
            release_date: Some("2020-04-23"),
            support_end_date: Some("2025-04-23"),
            eol_date: Some("2030-04-23"),
            lts: true,
        },
    ),
    (
        "ubuntu-22.04",
        StaticCycle {
            cycle: "22.04 LTS",
            release_date: Some("2022-04-21"),
            support_end_date: Some("2027-04-21"),
            eol_date: Some("2032-04-21"),
            lts: true,
        },
    ),
    (
        "ubuntu-24.04",
        StaticCycle {
            cycle: "24.04 LTS",
            release_date: Some("2024-04-25"),
            support_end_date: Some("2029-04-25"),
            eol_date: Some("2034-04-25"),
            lts: true,
        },
    ),
];

fn parser(html: &str, version_hint: Option<&crate::domain_types::SoftwareVersion>) -> Option<ParsedCycle> {
    let rows = scrape_table_rows(html, "table tbody tr", "td");
    let version_slice = version_hint.map(crate::domain_types::SoftwareVersion::major_minor);

    rows.into_iter().find_map(|cells| {
        if cells.len() < 3 {
            return None;
        }
        let cycle = cells.first()?.clone();
        if let Some(ref needle) = version_slice
            && !cycle.contains(needle.as_str())
        {
            return None;
        }
        Some(ParsedCycle {
            cycle: cycle.clone(),
            release_date: cells.get(1).cloned(),
            support_end_date: cells.get(2).cloned(),
            eol_date: cells.get(3).cloned(),
            lts: cycle.to_lowercase().contains("lts"),
        })
    })
}

/// Parse every row of the Ubuntu releases listing page into cycles.
#[must_use]
pub fn bulk_parser(html: &str) -> Vec<ParsedCycle> {
    scrape_table_rows(html, "table tbody tr", "td")
        .into_iter()
        .filter_map(|cells| {
            if cells.len() < 3 {
                return None;
            }
            let cycle = cells.first()?.clone();
            Some(ParsedCycle {
                lts: cycle.to_lowercase().contains("lts"),
                cycle,
                release_date: cells.get(1).cloned(),
                support_end_date: cells.get(2).cloned(),
                eol_date: cells.get(3).cloned(),
            })
        })
        .collect()
}


/// Build the Ubuntu vendor agent.
#[must_use]
pub fn build(cache: Arc<TieredCache>, telemetry: Arc<TelemetryCollector>, timeout: Duration) -> VendorAgent {
    let urls = vec![
        AgentUrl::new("https://endoflife.date/ubuntu", "Ubuntu release schedule", 1),
        AgentUrl::new(
            "https://ubuntu.com/about/release-cycle",
            "Ubuntu release cycle overview",
            2,
        ),
    ];

    VendorAgent::new(
        "ubuntu",
        KEYWORDS,
        urls,
        StaticTable::new("ubuntu", false, TABLE),
        cache,
        telemetry,
        timeout,
        Box::new(parser),
    )
}
