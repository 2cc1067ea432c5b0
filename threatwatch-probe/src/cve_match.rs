// ---------------------------------------------------------------------------
// CVE component matcher
// ---------------------------------------------------------------------------
//
// Pure matching stage: no network, no storage. The engine hands it the
// component names surfaced by the earlier probes and the recent high-score
// CVE entries pulled from the repository.

use threatwatch_types::{CveEntry, Finding, Severity};

const DESCRIPTION_LIMIT: usize = 200;

/// Component names surfaced by a set of findings, deduplicated and in first
/// appearance order.
pub fn components_from_findings(findings: &[Finding]) -> Vec<String> {
    let mut components = Vec::new();
    for finding in findings {
        if let Some(component) = &finding.affected_component {
            if !component.is_empty() && !components.iter().any(|c| c == component) {
                components.push(component.clone());
            }
        }
    }
    components
}

/// Naive substring match of each component name against CVE descriptions.
/// The first matching CVE per component wins; a CVE may match several
/// components.
pub fn match_components(cves: &[CveEntry], components: &[String]) -> Vec<Finding> {
    let mut findings = Vec::new();

    for component in components {
        let needle = component.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        let hit = cves
            .iter()
            .find(|cve| cve.description.to_lowercase().contains(&needle));
        if let Some(cve) = hit {
            findings.push(cve_finding(cve, component));
        }
    }

    findings
}

fn cve_finding(cve: &CveEntry, component: &str) -> Finding {
    let severity = match cve.cvss_score {
        Some(score) if score >= 7.0 => Severity::High,
        _ => Severity::Medium,
    };
    let description: String = cve.description.chars().take(DESCRIPTION_LIMIT).collect();
    Finding {
        cve_id: Some(cve.cve_id.clone()),
        title: format!("Potential CVE Match: {}", cve.cve_id),
        description,
        severity,
        cvss_score: cve.cvss_score,
        affected_component: Some(component.to_string()),
        recommendation: Some(format!("Review and patch {}", cve.cve_id)),
        ..Finding::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cve(id: &str, score: Option<f64>, description: &str) -> CveEntry {
        CveEntry {
            cve_id: id.into(),
            cvss_score: score,
            description: description.into(),
            published_date: None,
            reference_url: None,
            source: "test".into(),
        }
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let cves = [cve(
            "CVE-2024-0001",
            Some(9.8),
            "Remote code execution in NGINX versions before 1.25",
        )];
        let findings = match_components(&cves, &["nginx".to_string()]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].cve_id.as_deref(), Some("CVE-2024-0001"));
        assert_eq!(findings[0].title, "Potential CVE Match: CVE-2024-0001");
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].cvss_score, Some(9.8));
    }

    #[test]
    fn first_matching_cve_wins_per_component() {
        let cves = [
            cve("CVE-2024-0001", Some(8.0), "Issue in openssh server"),
            cve("CVE-2024-0002", Some(9.0), "Another openssh issue"),
        ];
        let findings = match_components(&cves, &["openssh".to_string()]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].cve_id.as_deref(), Some("CVE-2024-0001"));
    }

    #[test]
    fn severity_drops_to_medium_below_cvss_seven() {
        let cves = [cve("CVE-2024-0003", Some(6.5), "Flaw in apache httpd")];
        let findings = match_components(&cves, &["apache".to_string()]);
        assert_eq!(findings[0].severity, Severity::Medium);

        let cves = [cve("CVE-2024-0004", None, "Flaw in apache httpd")];
        let findings = match_components(&cves, &["apache".to_string()]);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn unmatched_components_are_silent() {
        let cves = [cve("CVE-2024-0001", Some(9.8), "Issue in nginx")];
        assert!(match_components(&cves, &["postgres".to_string()]).is_empty());
        assert!(match_components(&cves, &[]).is_empty());
        assert!(match_components(&[], &["nginx".to_string()]).is_empty());
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let long = format!("nginx {}", "x".repeat(400));
        let cves = [cve("CVE-2024-0005", Some(7.5), &long)];
        let findings = match_components(&cves, &["nginx".to_string()]);
        assert_eq!(findings[0].description.chars().count(), 200);
    }

    #[test]
    fn components_collected_in_order_without_duplicates() {
        let findings = [
            Finding {
                affected_component: Some("Port 21".into()),
                ..Finding::default()
            },
            Finding {
                affected_component: Some("Web Server".into()),
                ..Finding::default()
            },
            Finding {
                affected_component: Some("Port 21".into()),
                ..Finding::default()
            },
            Finding::default(),
        ];
        assert_eq!(
            components_from_findings(&findings),
            vec!["Port 21".to_string(), "Web Server".to_string()]
        );
    }
}
