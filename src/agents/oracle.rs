//! Oracle vendor agent: Oracle Database, Java SE, WebLogic.
//!
//! Oracle Database versions use a "c" release-label granularity (`19c`,
//! `21c`, `23ai`).

use super::base::{StaticTable, scrape_table_rows};
use super::vendor::VendorAgent;
use crate::cache::TieredCache;
use crate::domain_types::{AgentUrl, ParsedCycle, StaticCycle};
use crate::telemetry::TelemetryCollector;
use std::sync::Arc;
use std::time::Duration;

/// Relevance keywords.
pub const KEYWORDS: &[&str] = &["oracle", "weblogic", "java se", "oracle database"];

const TABLE: &[(&str, StaticCycle)] = &[
    (
        "oracle-19",
        StaticCycle {
            cycle: "19c",
            release_date: Some("2019-04-01"),
            support_end_date: Some("2024-04-30"),
            eol_date: Some("2027-04-30"),
            lts: true,
        },
    ),
    (
        "oracle-21",
        StaticCycle {
            cycle: "21c",
            release_date: Some("2021-08-01"),
            support_end_date: Some("2024-04-30"),
            eol_date: Some("2024-04-30"),
            lts: false,
        },
    ),
    (
        "oracle-23",
        StaticCycle {
            cycle: "23ai",
            release_date: Some("2024-05-02"),
            support_end_date: Some("2029-04-30"),
            eol_date: Some("2032-04-30"),
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
            cycle,
            release_date: cells.get(1).cloned(),
            support_end_date: cells.get(2).cloned(),
            eol_date: cells.get(3).cloned(),
            lts: false,
        })
    })
}

/// Build the Oracle vendor agent.
#[must_use]
pub fn build(cache: Arc<TieredCache>, telemetry: Arc<TelemetryCollector>, timeout: Duration) -> VendorAgent {
    let urls = vec![
        AgentUrl::new(
            "https://www.oracle.com/database/technologies/appdev/release-schedule.html",
            "Oracle Database release schedule",
            1,
        ),
        AgentUrl::new("https://endoflife.date/oracle-database", "Oracle Database EOL schedule", 2),
    ];

    VendorAgent::new(
        "oracle",
        KEYWORDS,
        urls,
        StaticTable::new("oracle", true, TABLE),
        cache,
        telemetry,
        timeout,
        Box::new(parser),
    )
}
