//! Confidence scoring for a single agent's answer within one `lookup` call,
//! "Confidence scoring" rules.

use crate::domain_types::EolEnvelope;

/// Score `envelope` given whether `agent_name` was reached via a matching
/// vendor-routing entry (as opposed to the generic `endoflife`/`fallback`
/// agents, or an OS-specialist prepend that didn't actually match keywords).
#[must_use]
pub fn score(is_routed_vendor_match: bool, envelope: &EolEnvelope) -> f64 {
    let mut confidence: f64 = 0.5;

    if is_routed_vendor_match {
        confidence = 0.9;
    }
    if envelope.eol_date.is_some() {
        confidence += 0.2;
    }
    if envelope.support_end_date.is_some() {
        confidence += 0.1;
    }
    if envelope.release_date.is_some() {
        confidence += 0.1;
    }

    confidence.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::base::success_envelope;
    use crate::domain_types::{ConfidenceScore, DataSource};
    use chrono::Utc;

    #[test]
    fn unrouted_agent_with_only_eol_date_scores_point_seven() {
        let envelope = success_envelope(
            "endoflife",
            "tomcat",
            "10.1",
            Some(Utc::now()),
            None,
            None,
            ConfidenceScore::clamp(0.8),
            None,
            DataSource::Scraped,
        );
        assert!((score(false, &envelope) - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn routed_vendor_match_with_every_date_caps_at_one() {
        let envelope = success_envelope(
            "apache",
            "tomcat",
            "10.1",
            Some(Utc::now()),
            Some(Utc::now()),
            Some(Utc::now()),
            ConfidenceScore::clamp(0.9),
            None,
            DataSource::Static,
        );
        assert!((score(true, &envelope) - 1.0).abs() < f64::EPSILON);
    }
}
