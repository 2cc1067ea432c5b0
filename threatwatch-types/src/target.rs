use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What kind of asset a scan target points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Domain,
    Ip,
    Url,
    Subdomain,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Domain => write!(f, "domain"),
            TargetType::Ip => write!(f, "ip"),
            TargetType::Url => write!(f, "url"),
            TargetType::Subdomain => write!(f, "subdomain"),
        }
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domain" => Ok(TargetType::Domain),
            "ip" => Ok(TargetType::Ip),
            "url" => Ok(TargetType::Url),
            "subdomain" => Ok(TargetType::Subdomain),
            other => Err(format!("unknown target type: {other}")),
        }
    }
}

/// How often the scheduler runs a full scan against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanFrequency {
    Daily,
    Weekly,
    Monthly,
    Manual,
}

impl fmt::Display for ScanFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanFrequency::Daily => write!(f, "daily"),
            ScanFrequency::Weekly => write!(f, "weekly"),
            ScanFrequency::Monthly => write!(f, "monthly"),
            ScanFrequency::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for ScanFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(ScanFrequency::Daily),
            "weekly" => Ok(ScanFrequency::Weekly),
            "monthly" => Ok(ScanFrequency::Monthly),
            "manual" => Ok(ScanFrequency::Manual),
            other => Err(format!("unknown scan frequency: {other}")),
        }
    }
}

/// An asset registered for scanning. `(organization_id, target_value)` is
/// unique; targets are never deleted automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTarget {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub target_type: TargetType,
    pub target_value: String,
    pub is_active: bool,
    pub scan_frequency: ScanFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scan_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_scan_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}
