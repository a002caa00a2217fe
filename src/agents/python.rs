//! Python vendor agent.
//!
//! CPython versions at major.minor granularity (3.9, 3.10, …).

use super::base::{StaticTable, scrape_table_rows};
use super::vendor::VendorAgent;
use crate::cache::TieredCache;
use crate::domain_types::{AgentUrl, ParsedCycle, StaticCycle};
use crate::telemetry::TelemetryCollector;
use std::sync::Arc;
use std::time::Duration;

/// Relevance keywords.
pub const KEYWORDS: &[&str] = &["python", "cpython", "pypy"];

const TABLE: &[(&str, StaticCycle)] = &[
    (
        "python-3.9",
        StaticCycle {
            cycle: "3.9",
            release_date: Some("2020-10-05"),
            support_end_date: None,
            eol_date: Some("2025-10-05"),
            lts: false,
        },
    ),
    (
        "python-3.10",
        StaticCycle {
            cycle: "3.10",
            release_date: Some("2021-10-04"),
            support_end_date: None,
            eol_date: Some("2026-10-04"),
            lts: false,
        },
    ),
    (
        "python-3.11",
        StaticCycle {
            cycle: "3.11",
            release_date: Some("2022-10-24"),
            support_end_date: None,
            eol_date: Some("2027-10-24"),
            lts: false,
        },
    ),
    (
        "python-3.12",
        StaticCycle {
            cycle: "3.12",
            release_date: Some("2023-10-02"),
            support_end_date: None,
            eol_date: Some("2028-10-02"),
            lts: false,
        },
    ),
    (
        "python-3.13",
        StaticCycle {
            cycle: "3.13",
            release_date: Some("2024-10-07"),
            support_end_date: None,
            eol_date: Some("2029-10-07"),
            lts: false,
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
            cycle,
            release_date: cells.get(1).cloned(),
            support_end_date: None,
            eol_date: cells.get(2).cloned(),
            lts: false,
        })
    })
}

/// Build the Python vendor agent.
#[must_use]
pub fn build(cache: Arc<TieredCache>, telemetry: Arc<TelemetryCollector>, timeout: Duration) -> VendorAgent {
    let urls = vec![
        AgentUrl::new(
            "https://devguide.python.org/versions/",
            "CPython supported versions",
            1,
        ),
        AgentUrl::new("https://endoflife.date/python", "Python EOL schedule", 2),
    ];

    VendorAgent::new(
        "python",
        KEYWORDS,
        urls,
        StaticTable::new("python", false, TABLE),
        cache,
        telemetry,
        timeout,
        Box::new(parser),
    )
}
