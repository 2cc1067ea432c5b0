// ---------------------------------------------------------------------------
// Risk scoring
// ---------------------------------------------------------------------------
//
// Pure and deterministic: the same finding multiset always yields the same
// score, regardless of probe order.

use threatwatch_types::{Finding, SeverityCounts};

const SCORE_CAP: u32 = 100;

/// Weighted sum of finding severities, capped at 100. No findings scores 0.
pub fn risk_score(findings: &[Finding]) -> u8 {
    let total: u32 = findings.iter().map(|f| f.severity.weight()).sum();
    total.min(SCORE_CAP) as u8
}

/// Per-severity tally of a finding set.
pub fn severity_counts(findings: &[Finding]) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for finding in findings {
        counts.increment(finding.severity);
    }
    counts
}

/// Score and tally in one pass over the findings.
pub fn aggregate(findings: &[Finding]) -> (u8, SeverityCounts) {
    (risk_score(findings), severity_counts(findings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use threatwatch_types::Severity;

    fn with_severity(severity: Severity) -> Finding {
        Finding {
            severity,
            ..Finding::default()
        }
    }

    #[test]
    fn empty_set_scores_zero() {
        assert_eq!(risk_score(&[]), 0);
        assert_eq!(severity_counts(&[]).total(), 0);
    }

    #[test]
    fn score_is_the_weighted_sum() {
        // Two high (15) plus one medium (8).
        let findings = vec![
            with_severity(Severity::High),
            with_severity(Severity::High),
            with_severity(Severity::Medium),
        ];
        assert_eq!(risk_score(&findings), 38);
    }

    #[test]
    fn score_caps_at_one_hundred() {
        let findings: Vec<Finding> = (0..5).map(|_| with_severity(Severity::Critical)).collect();
        assert_eq!(risk_score(&findings), 100);

        let findings: Vec<Finding> = (0..200).map(|_| with_severity(Severity::Info)).collect();
        assert_eq!(risk_score(&findings), 100);
    }

    #[test]
    fn score_is_order_independent() {
        let mut findings = vec![
            with_severity(Severity::Critical),
            with_severity(Severity::Low),
            with_severity(Severity::Medium),
            with_severity(Severity::Info),
        ];
        let forward = risk_score(&findings);
        findings.reverse();
        assert_eq!(risk_score(&findings), forward);
        assert_eq!(forward, 37);
    }

    #[test]
    fn counts_sum_to_finding_total() {
        let findings = vec![
            with_severity(Severity::High),
            with_severity(Severity::High),
            with_severity(Severity::Info),
            with_severity(Severity::Critical),
        ];
        let counts = severity_counts(&findings);
        assert_eq!(counts.high, 2);
        assert_eq!(counts.info, 1);
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.total() as usize, findings.len());
    }
}
