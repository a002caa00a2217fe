//! Candidate-list construction: turns a software/version query into an
//! ordered list of agent names worth trying.

use crate::agents::{apache, microsoft, nodejs, oracle, php, postgresql, python, redhat, ubuntu, vmware};
use crate::domain_types::SoftwareName;

/// The static vendor-keyword map the orchestrator's routing consults, in
/// declaration order.
const VENDOR_KEYWORD_MAP: &[(&str, &[&str])] = &[
    ("microsoft", microsoft::KEYWORDS),
    ("redhat", redhat::KEYWORDS),
    ("ubuntu", ubuntu::KEYWORDS),
    ("apache", apache::KEYWORDS),
    ("nodejs", nodejs::KEYWORDS),
    ("python", python::KEYWORDS),
    ("php", php::KEYWORDS),
    ("postgresql", postgresql::KEYWORDS),
    ("oracle", oracle::KEYWORDS),
    ("vmware", vmware::KEYWORDS),
];

/// Generic, vendor-agnostic agent names appended to every routed candidate
/// list (never count as a "routed vendor match" for confidence scoring).
pub const GENERIC_AGENTS: &[&str] = &["endoflife", "fallback"];

/// Whether `agent_name` is one of the statically keyword-routed vendor
/// agents (used by the confidence scorer to decide if an answer came from
/// a matched vendor specialist).
#[must_use]
pub fn is_vendor_routed(agent_name: &str) -> bool {
    VENDOR_KEYWORD_MAP.iter().any(|(name, _)| *name == agent_name)
}

fn os_specialist(normalized: &str) -> Option<&'static str> {
    if normalized.contains("windows") {
        Some("microsoft")
    } else if normalized.contains("ubuntu") || normalized.contains("debian") {
        Some("ubuntu")
    } else if normalized.contains("red hat") || normalized.contains("redhat") || normalized.contains("centos") || normalized.contains("fedora") {
        Some("redhat")
    } else {
        None
    }
}

fn dedupe_preserve_order(names: Vec<&'static str>) -> Vec<&'static str> {
    let mut seen = std::collections::HashSet::new();
    names.into_iter().filter(|name| seen.insert(*name)).collect()
}

/// Build the ordered candidate agent-name list for one `lookup` call.
///
/// When no vendor keyword matches (the vendor-routing step yields nothing),
/// the generic headless-search `fallback` agent is inserted ahead of
/// `endoflife` too, since leaving it out entirely whenever routing draws a
/// blank would strand unrecognised software with only the thin `endoflife`
/// JSON client (see DESIGN.md's Open Question resolution).
#[must_use]
pub fn build_candidates(software: &SoftwareName, kind: Option<&str>, internet_only: bool) -> Vec<&'static str> {
    if internet_only {
        return vec!["fallback"];
    }

    let normalized = software.normalized();
    let mut candidates: Vec<&'static str> = VENDOR_KEYWORD_MAP
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| normalized.contains(kw)))
        .map(|(name, _)| *name)
        .collect();

    if kind == Some("os")
        && let Some(specialist) = os_specialist(&normalized)
    {
        candidates.insert(0, specialist);
    }

    if candidates.is_empty() {
        candidates.push("fallback");
    }
    candidates.push("endoflife");

    dedupe_preserve_order(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internet_only_mode_routes_to_fallback_alone() {
        let software = SoftwareName::try_new("anything").unwrap();
        assert_eq!(build_candidates(&software, None, true), vec!["fallback"]);
    }

    #[test]
    fn os_specialist_is_prepended_for_recognised_families() {
        let software = SoftwareName::try_new("Windows Server 2012 R2").unwrap();
        let candidates = build_candidates(&software, Some("os"), false);
        assert_eq!(candidates.first(), Some(&"microsoft"));
    }

    #[test]
    fn unrecognised_software_falls_through_to_fallback_and_endoflife() {
        let software = SoftwareName::try_new("SomeBespokeInternalTool").unwrap();
        let candidates = build_candidates(&software, None, false);
        assert_eq!(candidates, vec!["fallback", "endoflife"]);
    }

    #[test]
    fn matched_vendor_is_deduplicated_against_the_os_specialist_prepend() {
        let software = SoftwareName::try_new("Ubuntu 20.04").unwrap();
        let candidates = build_candidates(&software, Some("os"), false);
        assert_eq!(candidates, vec!["ubuntu", "endoflife"]);
    }
}
