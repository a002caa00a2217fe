//! Red Hat vendor agent: RHEL, CentOS, Fedora.
//!
//! RHEL versions at major granularity (7, 8, 9).

use super::base::{StaticTable, scrape_table_rows};
use super::vendor::VendorAgent;
use crate::cache::TieredCache;
use crate::domain_types::{AgentUrl, ParsedCycle, StaticCycle};
use crate::telemetry::TelemetryCollector;
use std::sync::Arc;
use std::time::Duration;

/// Relevance keywords worked example: `{red hat, rhel, centos, fedora, ...}`.
pub const KEYWORDS: &[&str] = &["red hat", "redhat", "rhel", "centos", "fedora"];

const TABLE: &[(&str, StaticCycle)] = &[
    (
        "rhel-7",
        StaticCycle {
            cycle: "7",
            release_date: Some("2014-06-10"),
            support_end_date: Some("2024-06-30"),
            eol_date: Some("2028-06-30"),
            lts: true,
        },
    ),
    (
        "rhel-8",
        StaticCycle {
            cycle: "8",
            release_date: Some("2019-05-07"),
            support_end_date: Some("2024-05-31"),
            eol_date: Some("2029-05-31"),
            lts: true,
        },
    ),
    (
        "rhel-9",
        StaticCycle {
            cycle: "9",
            release_date: Some("2022-05-17"),
            support_end_date: Some("2027-05-31"),
            eol_date: Some("2032-05-31"),
            lts: true,
        },
    ),
    (
        "centos-7",
        StaticCycle {
            cycle: "7",
            release_date: Some("2014-07-07"),
            support_end_date: None,
            eol_date: Some("2024-06-30"),
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
            support_end_date: cells.get(2).cloned(),
            eol_date: cells.get(3).cloned(),
            lts: true,
        })
    })
}

/// Build the Red Hat vendor agent.
#[must_use]
pub fn build(cache: Arc<TieredCache>, telemetry: Arc<TelemetryCollector>, timeout: Duration) -> VendorAgent {
    let urls = vec![
        AgentUrl::new(
            "https://access.redhat.com/support/policy/updates/errata",
            "Red Hat Enterprise Linux life cycle",
            1,
        ),
        AgentUrl::new(
            "https://endoflife.date/centos",
            "CentOS release schedule",
            2,
        ),
    ];

    VendorAgent::new(
        "redhat",
        KEYWORDS,
        urls,
        StaticTable::new("rhel", true, TABLE),
        cache,
        telemetry,
        timeout,
        Box::new(parser),
    )
}
