use std::time::Duration;

/// Knobs shared by the probes and the scan engine. Injected at construction
/// time; nothing reads global state.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// TCP connect + TLS handshake timeout for the SSL probe.
    pub ssl_timeout: Duration,
    /// Whole-request timeout for the web probe.
    pub http_timeout: Duration,
    /// Per-port connect timeout for the fallback TCP sweep.
    pub port_connect_timeout: Duration,
    /// Ports tried by the fallback TCP sweep when no service detector is
    /// available.
    pub sweep_ports: Vec<u16>,
    /// How many recent CVEs the vulnerability stage considers.
    pub recent_cve_limit: usize,
    /// Minimum CVSS score for a CVE to be considered by the matcher.
    pub min_cvss: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ssl_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
            port_connect_timeout: Duration::from_secs(1),
            sweep_ports: vec![21, 22, 23, 25, 53, 80, 110, 143, 443, 3306, 5432, 8080],
            recent_cve_limit: 10,
            min_cvss: 7.0,
        }
    }
}
