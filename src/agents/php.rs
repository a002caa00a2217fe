//! PHP vendor agent.
//!
//! PHP versions at major.minor granularity (7.4, 8.1, …).

use super::base::{StaticTable, scrape_table_rows};
use super::vendor::VendorAgent;
use crate::cache::TieredCache;
use crate::domain_types::{AgentUrl, ParsedCycle, StaticCycle};
use crate::telemetry::TelemetryCollector;
use std::sync::Arc;
use std::time::Duration;

/// Relevance keywords.
pub const KEYWORDS: &[&str] = &["php"];

const TABLE: &[(&str, StaticCycle)] = &[
    (
        "php-7.4",
        StaticCycle {
            cycle: "7.4",
            release_date: Some("2019-11-28"),
            support_end_date: Some("2021-11-28"),
            eol_date: Some("2022-11-28"),
            lts: false,
        },
    ),
    (
        "php-8.1",
        StaticCycle {
            cycle: "8.1",
            release_date: Some("2021-11-25"),
            support_end_date: Some("2023-11-25"),
            eol_date: Some("2025-11-25"),
            lts: false,
        },
    ),
    (
        "php-8.2",
        StaticCycle {
            cycle: "8.2",
            release_date: Some("2022-12-08"),
            support_end_date: Some("2024-12-08"),
            eol_date: Some("2026-12-08"),
            lts: false,
        },
    ),
    (
        "php-8.3",
        StaticCycle {
            cycle: "8.3",
            release_date: Some("2023-11-23"),
            support_end_date: Some("2025-11-23"),
            eol_date: Some("2027-11-23"),
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
            support_end_date: cells.get(2).cloned(),
            eol_date: cells.get(3).cloned(),
            lts: false,
        })
    })
}

/// Build the PHP vendor agent.
#[must_use]
pub fn build(cache: Arc<TieredCache>, telemetry: Arc<TelemetryCollector>, timeout: Duration) -> VendorAgent {
    let urls = vec![
        AgentUrl::new("https://www.php.net/supported-versions.php", "PHP supported versions", 1),
        AgentUrl::new("https://endoflife.date/php", "PHP EOL schedule", 2),
    ];

    VendorAgent::new(
        "php",
        KEYWORDS,
        urls,
        StaticTable::new("php", false, TABLE),
        cache,
        telemetry,
        timeout,
        Box::new(parser),
    )
}
