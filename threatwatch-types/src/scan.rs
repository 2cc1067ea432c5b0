use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::finding::FindingRecord;
use crate::severity::Severity;

/// Which class of checks a scan runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    Ssl,
    Port,
    Web,
    Vulnerability,
    Full,
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanType::Ssl => write!(f, "ssl"),
            ScanType::Port => write!(f, "port"),
            ScanType::Web => write!(f, "web"),
            ScanType::Vulnerability => write!(f, "vulnerability"),
            ScanType::Full => write!(f, "full"),
        }
    }
}

impl FromStr for ScanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ssl" => Ok(ScanType::Ssl),
            "port" => Ok(ScanType::Port),
            "web" => Ok(ScanType::Web),
            "vulnerability" => Ok(ScanType::Vulnerability),
            "full" => Ok(ScanType::Full),
            other => Err(format!("unknown scan type: {other}")),
        }
    }
}

/// Scan lifecycle state. Transitions are monotonic:
/// pending -> running -> completed | failed. A completed or failed record is
/// immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStatus::Pending => write!(f, "pending"),
            ScanStatus::Running => write!(f, "running"),
            ScanStatus::Completed => write!(f, "completed"),
            ScanStatus::Failed => write!(f, "failed"),
            ScanStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScanStatus::Pending),
            "running" => Ok(ScanStatus::Running),
            "completed" => Ok(ScanStatus::Completed),
            "failed" => Ok(ScanStatus::Failed),
            "cancelled" => Ok(ScanStatus::Cancelled),
            other => Err(format!("unknown scan status: {other}")),
        }
    }
}

/// Per-severity finding tally for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub info: u32,
}

impl SeverityCounts {
    pub fn increment(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.critical + self.high + self.medium + self.low + self.info
    }
}

/// The persisted unit of one scan execution and its outcome.
///
/// `counts` and `risk_score` are always derived from the finding set; there
/// is no independent source of truth for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub organization_id: String,
    pub target_id: String,
    pub scan_type: ScanType,
    pub status: ScanStatus,
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub counts: SeverityCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<FindingRecord>,
    pub created_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_type_roundtrip() {
        for ty in ["ssl", "port", "web", "vulnerability", "full"] {
            let parsed: ScanType = ty.parse().unwrap();
            assert_eq!(parsed.to_string(), ty);
        }
        assert!("dns".parse::<ScanType>().is_err());
    }

    #[test]
    fn severity_counts_tally() {
        let mut counts = SeverityCounts::default();
        counts.increment(Severity::High);
        counts.increment(Severity::High);
        counts.increment(Severity::Info);
        assert_eq!(counts.high, 2);
        assert_eq!(counts.info, 1);
        assert_eq!(counts.total(), 3);
    }
}
