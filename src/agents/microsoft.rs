//! Microsoft vendor agent: Windows desktop/server, SQL Server, .NET.
//!
//! The scrape path targets the Microsoft Lifecycle docs listing page,
//! whose rows this module parses generically via
//! `agents::base::scrape_table_rows`.

use super::base::{StaticTable, scrape_table_rows};
use super::vendor::VendorAgent;
use crate::cache::TieredCache;
use crate::domain_types::{AgentUrl, ParsedCycle, StaticCycle};
use crate::telemetry::TelemetryCollector;
use std::sync::Arc;
use std::time::Duration;

/// Keywords the orchestrator's routing map matches against the query.
pub const KEYWORDS: &[&str] = &[
    "windows",
    "microsoft",
    "sql server",
    "sqlserver",
    ".net",
    "dotnet",
    "exchange",
    "sharepoint",
    "office",
];

const TABLE: &[(&str, StaticCycle)] = &[
    (
        "windows-10",
        StaticCycle {
            cycle: "10 22H2",
            release_date: Some("2015-07-29"),
            support_end_date: Some("2025-10-14"),
            eol_date: Some("2025-10-14"),
            lts: false,
        },
    ),
    (
        "windows-11",
        StaticCycle {
            cycle: "11 23H2",
            release_date: Some("2023-10-31"),
            support_end_date: Some("2025-11-11"),
            eol_date: Some("2026-11-10"),
            lts: false,
        },
    ),
    (
        "windows-server-2012-r2",
        StaticCycle {
            cycle: "2012 R2",
            release_date: Some("2013-10-18"),
            support_end_date: Some("2018-10-09"),
            eol_date: Some("2023-10-10"),
            lts: false,
        },
    ),
    (
        "windows-server-2016",
        StaticCycle {
            cycle: "2016",
            release_date: Some("2016-10-15"),
            support_end_date: Some("2022-01-11"),
            eol_date: Some("2027-01-12"),
            lts: false,
        },
    ),
    (
        "windows-server-2019",
        StaticCycle {
            cycle: "2019",
            release_date: Some("2018-11-13"),
            support_end_date: Some("2024-01-09"),
            eol_date: Some("2029-01-09"),
            lts: false,
        },
    ),
    (
        "windows-server-2022",
        StaticCycle {
            cycle: "2022",
            release_date: Some("2021-08-18"),
            support_end_date: Some("2026-10-13"),
            eol_date: Some("2031-10-14"),
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

/// Build the Microsoft vendor agent.
#[must_use]
pub fn build(cache: Arc<TieredCache>, telemetry: Arc<TelemetryCollector>, timeout: Duration) -> VendorAgent {
    let urls = vec![
        AgentUrl::new(
            "https://learn.microsoft.com/en-us/lifecycle/products/",
            "Microsoft Lifecycle product index",
            1,
        ),
        AgentUrl::new(
            "https://learn.microsoft.com/en-us/lifecycle/products/windows-10-home-and-pro",
            "Windows 10 lifecycle",
            2,
        ),
    ];

    VendorAgent::new(
        "microsoft",
        KEYWORDS,
        urls,
        StaticTable::new("windows", false, TABLE),
        cache,
        telemetry,
        timeout,
        Box::new(parser),
    )
}
