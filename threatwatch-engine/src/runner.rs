// ---------------------------------------------------------------------------
// Scan runner
// ---------------------------------------------------------------------------
//
// Owns probe construction and the scan lifecycle. The store lock is held
// only around individual storage calls, never across probe execution.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use threatwatch_db::{current_period, DbError, Store};
use threatwatch_probe::{
    components_from_findings, match_components, PortProbe, Probe, SslProbe, WebProbe,
};
use threatwatch_types::{
    now_ms, Finding, MetricType, ProbeConfig, QuotaDecision, ScanRecord, ScanType,
};

use crate::scoring::aggregate;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("organization not found: {0}")]
    OrganizationNotFound(String),
}

/// Outcome of a scan creation request. Quota refusal is not an error: it is
/// a normal, reportable decision.
pub enum CreateScanOutcome {
    Created {
        scan: ScanRecord,
        usage: QuotaDecision,
    },
    QuotaExceeded {
        used: i64,
        limit: i64,
    },
    TargetNotFound,
}

pub struct ScanRunner {
    store: Arc<Mutex<Store>>,
    config: ProbeConfig,
    ssl: Arc<dyn Probe>,
    port: Arc<dyn Probe>,
    web: Arc<dyn Probe>,
}

impl ScanRunner {
    pub fn new(store: Arc<Mutex<Store>>, config: ProbeConfig) -> Self {
        let ssl = Arc::new(SslProbe::new(&config));
        let port = Arc::new(PortProbe::new(&config));
        let web = Arc::new(WebProbe::new(&config));
        Self::with_probes(store, config, ssl, port, web)
    }

    /// Construct with explicit probe implementations (used by tests).
    pub fn with_probes(
        store: Arc<Mutex<Store>>,
        config: ProbeConfig,
        ssl: Arc<dyn Probe>,
        port: Arc<dyn Probe>,
        web: Arc<dyn Probe>,
    ) -> Self {
        Self {
            store,
            config,
            ssl,
            port,
            web,
        }
    }

    pub fn store(&self) -> &Arc<Mutex<Store>> {
        &self.store
    }

    /// Gate a scan request through the usage quota and create the pending
    /// record. The quota unit is consumed if and only if the record is
    /// created.
    pub async fn create_scan(
        &self,
        organization_id: &str,
        target_id: &str,
        scan_type: ScanType,
    ) -> Result<CreateScanOutcome, EngineError> {
        let store = self.store.lock().await;

        let org = store
            .get_organization(organization_id)?
            .ok_or_else(|| EngineError::OrganizationNotFound(organization_id.to_string()))?;
        if store.get_target(organization_id, target_id)?.is_none() {
            return Ok(CreateScanOutcome::TargetNotFound);
        }

        let (year, month) = current_period();
        let usage = store.try_consume(&org, MetricType::Scan, year, month)?;
        if !usage.allowed {
            info!(
                organization_id,
                used = usage.used,
                limit = usage.limit,
                "scan refused: monthly quota exhausted"
            );
            return Ok(CreateScanOutcome::QuotaExceeded {
                used: usage.used,
                limit: usage.limit,
            });
        }

        let scan = store.create_scan_record(organization_id, target_id, scan_type)?;
        info!(scan_id = %scan.id, organization_id, %scan_type, "scan created");
        Ok(CreateScanOutcome::Created { scan, usage })
    }

    /// Drive one scan to completion: running, probes, aggregate, persist.
    /// Storage failures mark the scan failed; nothing here panics or
    /// propagates. Returns whether the scan reached `completed`.
    pub async fn run_scan(&self, scan_id: &str, target_value: &str, scan_type: ScanType) -> bool {
        let started_at = now_ms();
        {
            let store = self.store.lock().await;
            match store.mark_scan_running(scan_id, started_at) {
                Ok(true) => {}
                Ok(false) => {
                    warn!(scan_id, "scan not in pending state, skipping");
                    return false;
                }
                Err(e) => {
                    error!(scan_id, error = %e, "failed to mark scan running");
                    return false;
                }
            }
        }

        let findings = self.execute(target_value, scan_type).await;
        let (risk_score, counts) = aggregate(&findings);

        let store = self.store.lock().await;
        match store.complete_scan(scan_id, &findings, risk_score, counts, now_ms()) {
            Ok(true) => {
                info!(
                    scan_id,
                    risk_score,
                    findings = findings.len(),
                    "scan completed"
                );
                true
            }
            Ok(false) => {
                warn!(scan_id, "scan no longer running at completion");
                false
            }
            Err(e) => {
                error!(scan_id, error = %e, "failed to persist scan outcome");
                if let Err(e) = store.fail_scan(scan_id, &e.to_string(), now_ms()) {
                    error!(scan_id, error = %e, "failed to mark scan failed");
                }
                false
            }
        }
    }

    /// Run the probes for a scan type and concatenate their findings in
    /// probe order. Probe failures never abort the scan: they fold into the
    /// probe's failure finding, or vanish when its failure policy is silent.
    async fn execute(&self, target: &str, scan_type: ScanType) -> Vec<Finding> {
        let mut findings = Vec::new();

        if matches!(scan_type, ScanType::Ssl | ScanType::Full) {
            self.run_probe(self.ssl.as_ref(), target, &mut findings)
                .await;
        }
        if matches!(scan_type, ScanType::Port | ScanType::Full) {
            self.run_probe(self.port.as_ref(), target, &mut findings)
                .await;
        }
        if matches!(scan_type, ScanType::Web | ScanType::Full) {
            self.run_probe(self.web.as_ref(), target, &mut findings)
                .await;
        }
        if matches!(scan_type, ScanType::Vulnerability | ScanType::Full) {
            let matched = self.match_cves(&findings).await;
            findings.extend(matched);
        }

        findings
    }

    async fn run_probe(&self, probe: &dyn Probe, target: &str, findings: &mut Vec<Finding>) {
        match probe.run(target).await {
            Ok(mut produced) => findings.append(&mut produced),
            Err(e) => {
                warn!(probe = probe.name(), target, error = %e, "probe failed");
                if let Some(finding) = probe.failure_finding(&e) {
                    findings.push(finding);
                }
            }
        }
    }

    /// Cross-reference components surfaced by earlier probes against recent
    /// high-score CVEs. Repository errors are swallowed: a broken CVE feed
    /// must not fail an otherwise healthy scan.
    async fn match_cves(&self, findings: &[Finding]) -> Vec<Finding> {
        let components = components_from_findings(findings);
        if components.is_empty() {
            return Vec::new();
        }
        let cves = {
            let store = self.store.lock().await;
            match store.recent_high_severity_cves(self.config.min_cvss, self.config.recent_cve_limit)
            {
                Ok(cves) => cves,
                Err(e) => {
                    warn!(error = %e, "cve lookup failed, skipping vulnerability matching");
                    return Vec::new();
                }
            }
        };
        match_components(&cves, &components)
    }
}
