use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sentinel plan limit meaning "no monthly cap".
pub const UNLIMITED: i64 = -1;

/// A tenant. Plan limits live directly on the organization row; `-1` means
/// unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub max_scans_per_month: i64,
    pub max_api_requests_per_month: i64,
    pub created_at: u64,
}

impl Organization {
    pub fn limit_for(&self, metric: MetricType) -> i64 {
        match metric {
            MetricType::Scan => self.max_scans_per_month,
            MetricType::ApiRequest => self.max_api_requests_per_month,
        }
    }
}

/// Metered usage dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Scan,
    ApiRequest,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricType::Scan => write!(f, "scan"),
            MetricType::ApiRequest => write!(f, "api_request"),
        }
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scan" => Ok(MetricType::Scan),
            "api_request" => Ok(MetricType::ApiRequest),
            other => Err(format!("unknown metric type: {other}")),
        }
    }
}

/// Outcome of a quota check. When `allowed` is true, `used` already includes
/// the unit just consumed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub used: i64,
    pub limit: i64,
}

impl QuotaDecision {
    pub fn remaining(&self) -> i64 {
        if self.limit == UNLIMITED {
            UNLIMITED
        } else {
            (self.limit - self.used).max(0)
        }
    }
}
