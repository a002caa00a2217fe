//! Risk-level derivation from a lifecycle window
//! `_process_eol_data` post-processing step.

/// Human-readable status and machine-readable risk level for a given
/// `days_until_eol`, per the boundary table below.
#[must_use]
pub fn status_and_risk(days_until_eol: i64) -> (&'static str, &'static str) {
    match days_until_eol {
        d if d < 0 => ("End of Life", "critical"),
        0..=90 => ("Critical", "critical"),
        91..=365 => ("High Risk", "high"),
        366..=730 => ("Medium Risk", "medium"),
        _ => ("Active Support", "low"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_values_map_to_the_documented_buckets() {
        assert_eq!(status_and_risk(-1), ("End of Life", "critical"));
        assert_eq!(status_and_risk(0), ("Critical", "critical"));
        assert_eq!(status_and_risk(90), ("Critical", "critical"));
        assert_eq!(status_and_risk(91), ("High Risk", "high"));
        assert_eq!(status_and_risk(365), ("High Risk", "high"));
        assert_eq!(status_and_risk(366), ("Medium Risk", "medium"));
        assert_eq!(status_and_risk(730), ("Medium Risk", "medium"));
        assert_eq!(status_and_risk(731), ("Active Support", "low"));
    }
}
