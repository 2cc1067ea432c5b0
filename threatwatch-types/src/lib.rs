pub mod config;
pub mod cve;
pub mod finding;
pub mod org;
pub mod scan;
pub mod severity;
pub mod target;
mod time;

pub use config::ProbeConfig;
pub use cve::CveEntry;
pub use finding::{Finding, FindingRecord, FindingReference};
pub use org::{MetricType, Organization, QuotaDecision, UNLIMITED};
pub use scan::{ScanRecord, ScanStatus, ScanType, SeverityCounts};
pub use severity::Severity;
pub use target::{ScanFrequency, ScanTarget, TargetType};
pub use time::now_ms;
