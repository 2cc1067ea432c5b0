use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// A single detected condition produced by one probe run.
///
/// This is the probe-side shape: no identity and no review state. The store
/// assigns ids and review flags when findings are persisted as children of a
/// scan (see [`FindingRecord`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cve_id: Option<String>,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvss_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<FindingReference>,
}

impl Default for Finding {
    fn default() -> Self {
        Self {
            cve_id: None,
            title: String::new(),
            description: String::new(),
            severity: Severity::Low,
            cvss_score: None,
            affected_component: None,
            recommendation: None,
            references: Vec::new(),
        }
    }
}

/// A structured reference attached to a finding (port list, header list,
/// CVE link, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

impl FindingReference {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// A persisted finding row. Review flags (`is_false_positive`, `is_resolved`)
/// are the only fields that may change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingRecord {
    pub id: String,
    pub scan_id: String,
    #[serde(flatten)]
    pub finding: Finding,
    pub is_false_positive: bool,
    pub is_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<u64>,
    pub created_at: u64,
}
