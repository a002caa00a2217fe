//! Apache Software Foundation vendor agent: Tomcat, httpd, Kafka, Spark.
//!
//! Tomcat versions at major granularity (`9`, `10`). Also exposes a
//! bulk-fetch parser for the Tomcat "which version" listing page

use super::base::{StaticTable, scrape_table_rows};
use super::vendor::VendorAgent;
use crate::cache::TieredCache;
use crate::domain_types::{AgentUrl, ParsedCycle, StaticCycle};
use crate::telemetry::TelemetryCollector;
use std::sync::Arc;
use std::time::Duration;

/// Relevance keywords worked example: `{apache, httpd, tomcat, kafka, spark, ...}`.
pub const KEYWORDS: &[&str] = &["apache", "httpd", "tomcat", "kafka", "spark"];

const TABLE: &[(&str, StaticCycle)] = &[
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
        "tomcat-11",
        StaticCycle {
            cycle: "11.0",
            release_date: Some("2024-10-04"),
            support_end_date: None,
            eol_date: Some("2031-03-31"),
            lts: false,
        },
    ),
    (
        "httpd-2",
        StaticCycle {
            cycle: "2.4",
            release_date: Some("2012-02-21"),
            support_end_date: None,
            eol_date: None,
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

/// Parse every row of the Tomcat version-support listing page into cycles,
/// bulk-fetch method.
#[must_use]
pub fn bulk_parser(html: &str) -> Vec<ParsedCycle> {
    scrape_table_rows(html, "table tbody tr", "td")
        .into_iter()
        .filter_map(|cells| {
            if cells.len() < 2 {
                return None;
            }
            Some(ParsedCycle {
                cycle: cells.first()?.clone(),
                release_date: cells.get(1).cloned(),
                support_end_date: None,
                eol_date: cells.get(2).cloned(),
                lts: false,
            })
        })
        .collect()
}

/// Build the Apache vendor agent.
#[must_use]
pub fn build(cache: Arc<TieredCache>, telemetry: Arc<TelemetryCollector>, timeout: Duration) -> VendorAgent {
    let urls = vec![
        AgentUrl::new(
            "https://tomcat.apache.org/whichversion.html",
            "Tomcat version support listing",
            1,
        ),
        AgentUrl::new("https://endoflife.date/apache-tomcat", "Tomcat release schedule", 2),
    ];

    VendorAgent::new(
        "apache",
        KEYWORDS,
        urls,
        StaticTable::new("tomcat", true, TABLE),
        cache,
        telemetry,
        timeout,
        Box::new(parser),
    )
}
