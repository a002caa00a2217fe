//! Node.js vendor agent.
//!
//! Node versions at major granularity (18, 20, 22). Also exposes a
//! bulk-fetch parser for the Node release schedule.

use super::base::{StaticTable, scrape_table_rows};
use super::vendor::VendorAgent;
use crate::cache::TieredCache;
use crate::domain_types::{AgentUrl, ParsedCycle, StaticCycle};
use crate::telemetry::TelemetryCollector;
use std::sync::Arc;
use std::time::Duration;

/// Relevance keywords.
pub const KEYWORDS: &[&str] = &["node.js", "nodejs", "node"];

const TABLE: &[(&str, StaticCycle)] = &[
    (
        "nodejs-18",
        StaticCycle {
            cycle: "18",
            release_date: Some("2022-04-19"),
            support_end_date: Some("2023-10-18"),
            eol_date: Some("2025-04-30"),
            lts: true,
        },
    ),
    (
        "nodejs-20",
        StaticCycle {
            cycle: "20",
            release_date: Some("2023-04-18"),
            support_end_date: Some("2024-10-22"),
            eol_date: Some("2026-04-30"),
            lts: true,
        },
    ),
    (
        "nodejs-22",
        StaticCycle {
            cycle: "22",
            release_date: Some("2024-04-24"),
            support_end_date: Some("2025-10-01"),
            eol_date: Some("2027-04-30"),
            lts: true,
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
            cycle: cycle.clone(),
            release_date: cells.get(1).cloned(),
            support_end_date: cells.get(2).cloned(),
            eol_date: cells.get(3).cloned(),
            lts: cycle.to_lowercase().contains("lts"),
        })
    })
}

/// Parse every row of the Node release schedule into cycles.
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

/// Build the Node.js vendor agent.
#[must_use]
pub fn build(cache: Arc<TieredCache>, telemetry: Arc<TelemetryCollector>, timeout: Duration) -> VendorAgent {
    let urls = vec![
        AgentUrl::new("https://nodejs.org/en/about/previous-releases", "Node.js release schedule", 1),
        AgentUrl::new("https://endoflife.date/nodejs", "Node.js EOL schedule", 2),
    ];

    VendorAgent::new(
        "nodejs",
        KEYWORDS,
        urls,
        StaticTable::new("nodejs", true, TABLE),
        cache,
        telemetry,
        timeout,
        Box::new(parser),
    )
}
