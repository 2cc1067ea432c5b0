// ---------------------------------------------------------------------------
// Scheduled scans
// ---------------------------------------------------------------------------
//
// One pass over the targets whose next_scan_at has come due. Scheduled scans
// go through the same quota gate as API-initiated ones; a quota refusal
// leaves the schedule untouched so the target is retried on a later pass.

use tracing::{info, warn};

use threatwatch_types::{now_ms, ScanFrequency, ScanType};

use crate::runner::{CreateScanOutcome, EngineError, ScanRunner};

/// What one scheduler pass did.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleSummary {
    pub due: usize,
    pub started: usize,
    pub skipped_quota: usize,
    pub failed: usize,
}

/// Next scheduled time after a run at `from_ms`, or `None` for targets that
/// only scan on demand.
pub fn next_scan_at(frequency: ScanFrequency, from_ms: u64) -> Option<u64> {
    let delta = match frequency {
        ScanFrequency::Daily => chrono::Duration::days(1),
        ScanFrequency::Weekly => chrono::Duration::days(7),
        ScanFrequency::Monthly => chrono::Duration::days(30),
        ScanFrequency::Manual => return None,
    };
    Some(from_ms.saturating_add(delta.num_milliseconds() as u64))
}

/// Run a full scan against every due target, advancing each target's
/// schedule on success.
pub async fn run_scheduled_scans(runner: &ScanRunner) -> Result<ScheduleSummary, EngineError> {
    let now = now_ms();
    let due = {
        let store = runner.store().lock().await;
        store.due_targets(now)?
    };

    let mut summary = ScheduleSummary {
        due: due.len(),
        ..ScheduleSummary::default()
    };

    for target in due {
        match runner
            .create_scan(&target.organization_id, &target.id, ScanType::Full)
            .await
        {
            Ok(CreateScanOutcome::Created { scan, .. }) => {
                let finished = runner
                    .run_scan(&scan.id, &target.target_value, ScanType::Full)
                    .await;
                if finished {
                    // Only a completed scan advances the schedule; anything
                    // else leaves the target due so it is retried next pass.
                    let completed = now_ms();
                    let next = next_scan_at(target.scan_frequency, completed);
                    let store = runner.store().lock().await;
                    store.mark_target_scanned(&target.id, completed, next)?;
                    summary.started += 1;
                } else {
                    warn!(
                        target_id = %target.id,
                        scan_id = %scan.id,
                        "scheduled scan did not complete, schedule not advanced"
                    );
                    summary.failed += 1;
                }
            }
            Ok(CreateScanOutcome::QuotaExceeded { used, limit }) => {
                warn!(
                    target_id = %target.id,
                    organization_id = %target.organization_id,
                    used,
                    limit,
                    "scheduled scan skipped: quota exhausted"
                );
                summary.skipped_quota += 1;
            }
            Ok(CreateScanOutcome::TargetNotFound) => {
                // Deleted between the due query and the gate.
                summary.failed += 1;
            }
            Err(e) => {
                warn!(target_id = %target.id, error = %e, "scheduled scan failed to start");
                summary.failed += 1;
            }
        }
    }

    if summary.due > 0 {
        info!(
            due = summary.due,
            started = summary.started,
            skipped_quota = summary.skipped_quota,
            failed = summary.failed,
            "scheduler pass complete"
        );
    }
    Ok(summary)
}
