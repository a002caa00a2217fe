//! VMware vendor agent: vSphere, ESXi, vCenter.
//!
//! VMware versions at major.minor granularity (`7.0`, `8.0`).

use super::base::{StaticTable, scrape_table_rows};
use super::vendor::VendorAgent;
use crate::cache::TieredCache;
use crate::domain_types::{AgentUrl, ParsedCycle, StaticCycle};
use crate::telemetry::TelemetryCollector;
use std::sync::Arc;
use std::time::Duration;

/// Relevance keywords.
pub const KEYWORDS: &[&str] = &["vmware", "vsphere", "esxi", "vcenter"];

const TABLE: &[(&str, StaticCycle)] = &[
    (
        "vmware-6.7",
        StaticCycle {
            cycle: "6.7",
            release_date: Some("2018-04-17"),
            support_end_date: Some("2022-11-15"),
            eol_date: Some("2023-10-15"),
            lts: false,
        },
    ),
    (
        "vmware-7.0",
        StaticCycle {
            cycle: "7.0",
            release_date: Some("2020-04-02"),
            support_end_date: Some("2025-04-02"),
            eol_date: Some("2025-10-02"),
            lts: false,
        },
    ),
    (
        "vmware-8.0",
        StaticCycle {
            cycle: "8.0",
            release_date: Some("2022-10-11"),
            support_end_date: Some("2027-10-11"),
            eol_date: Some("2027-10-11"),
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

/// Build the VMware vendor agent.
#[must_use]
pub fn build(cache: Arc<TieredCache>, telemetry: Arc<TelemetryCollector>, timeout: Duration) -> VendorAgent {
    let urls = vec![
        AgentUrl::new(
            "https://lifecycle.vmware.com/#/",
            "VMware product lifecycle matrix",
            1,
        ),
        AgentUrl::new("https://endoflife.date/vmware-vsphere", "vSphere EOL schedule", 2),
    ];

    VendorAgent::new(
        "vmware",
        KEYWORDS,
        urls,
        StaticTable::new("vmware", false, TABLE),
        cache,
        telemetry,
        timeout,
        Box::new(parser),
    )
}
