// ---------------------------------------------------------------------------
// Port probe
// ---------------------------------------------------------------------------

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use threatwatch_types::{Finding, FindingReference, ProbeConfig, Severity};

use crate::traits::{OpenPort, Probe, ProbeError, ServiceDetector};

/// Services that should not face the open internet. An open port from this
/// table is reported individually at high severity on top of the summary
/// finding.
const RISKY_PORTS: &[(u16, &str)] = &[
    (21, "FTP"),
    (23, "Telnet"),
    (1433, "MSSQL"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
];

pub struct PortProbe {
    detector: Option<Arc<dyn ServiceDetector>>,
    sweep_ports: Vec<u16>,
    connect_timeout: Duration,
}

impl PortProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            detector: None,
            sweep_ports: config.sweep_ports.clone(),
            connect_timeout: config.port_connect_timeout,
        }
    }

    pub fn with_detector(mut self, detector: Arc<dyn ServiceDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// TCP-connect sweep over the configured port list. Closed or filtered
    /// ports simply time out or refuse; neither is an error.
    async fn sweep(&self, host: &str) -> Vec<OpenPort> {
        let mut open = Vec::new();
        for &port in &self.sweep_ports {
            let attempt =
                tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port))).await;
            if let Ok(Ok(_)) = attempt {
                open.push(OpenPort::bare(port));
            }
        }
        open
    }

    async fn discover(&self, host: &str) -> Vec<OpenPort> {
        if let Some(detector) = &self.detector {
            match detector.detect(host).await {
                Ok(ports) => return ports,
                Err(e) => {
                    warn!(host, error = %e, "service detector failed, falling back to tcp sweep");
                }
            }
        }
        self.sweep(host).await
    }
}

#[async_trait]
impl Probe for PortProbe {
    fn name(&self) -> &'static str {
        "port"
    }

    async fn run(&self, target: &str) -> Result<Vec<Finding>, ProbeError> {
        let open = self.discover(target).await;
        debug!(target, open = open.len(), "port probe complete");
        Ok(findings_from_open_ports(&open))
    }
}

fn risky_service(port: u16) -> Option<&'static str> {
    RISKY_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, service)| *service)
}

/// Turn a list of open ports into findings: one high-severity finding per
/// risky service, plus a single medium summary finding when anything at all
/// is open. Applies identically to detector output and sweep output.
pub fn findings_from_open_ports(open: &[OpenPort]) -> Vec<Finding> {
    let mut findings = Vec::new();

    for entry in open {
        if let Some(service) = risky_service(entry.port) {
            let detected = entry
                .service
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(service);
            findings.push(Finding {
                title: format!("Risky Service Exposed: {service}"),
                description: format!(
                    "Port {} ({detected}) is open and may pose a security risk",
                    entry.port
                ),
                severity: Severity::High,
                affected_component: Some(format!("Port {}", entry.port)),
                recommendation: Some(format!(
                    "Close port {} or restrict access if the service is required",
                    entry.port
                )),
                ..Finding::default()
            });
        }
    }

    if !open.is_empty() {
        let mut ports: Vec<u16> = open.iter().map(|p| p.port).collect();
        ports.sort_unstable();
        let listed: Vec<String> = ports.iter().map(u16::to_string).collect();
        findings.push(Finding {
            title: "Open Ports Detected".into(),
            description: format!("Open ports found: {}", listed.join(", ")),
            severity: Severity::Medium,
            affected_component: Some("Network".into()),
            recommendation: Some("Review open ports and close any that are unnecessary".into()),
            references: vec![FindingReference::new("ports", serde_json::json!(ports))],
            ..Finding::default()
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_open_ports_no_findings() {
        assert!(findings_from_open_ports(&[]).is_empty());
    }

    #[test]
    fn safe_ports_only_produce_summary() {
        let open = [OpenPort::bare(80), OpenPort::bare(443)];
        let findings = findings_from_open_ports(&open);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "Open Ports Detected");
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].description, "Open ports found: 80, 443");
        assert_eq!(findings[0].references.len(), 1);
        assert_eq!(findings[0].references[0].data, serde_json::json!([80, 443]));
    }

    #[test]
    fn risky_ports_are_reported_individually() {
        let open = [OpenPort::bare(21), OpenPort::bare(3389)];
        let findings = findings_from_open_ports(&open);
        assert_eq!(findings.len(), 3);

        let high: Vec<_> = findings
            .iter()
            .filter(|f| f.severity == Severity::High)
            .collect();
        assert_eq!(high.len(), 2);
        assert_eq!(high[0].title, "Risky Service Exposed: FTP");
        assert_eq!(high[1].title, "Risky Service Exposed: RDP");
        assert_eq!(findings[2].title, "Open Ports Detected");
    }

    #[test]
    fn detector_service_name_overrides_table() {
        let open = [OpenPort {
            port: 3306,
            service: Some("mariadb".into()),
            product: None,
            version: None,
        }];
        let findings = findings_from_open_ports(&open);
        assert!(findings[0].description.contains("mariadb"));
    }
}
