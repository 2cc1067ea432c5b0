//! Scan orchestration: lifecycle, probe execution, risk scoring, and the
//! usage gate that meters scan creation per tenant.

pub mod runner;
pub mod schedule;
pub mod scoring;

pub use runner::{CreateScanOutcome, EngineError, ScanRunner};
pub use schedule::{next_scan_at, run_scheduled_scans, ScheduleSummary};
pub use scoring::{aggregate, risk_score, severity_counts};
