use async_trait::async_trait;
use threatwatch_types::Finding;

/// Trait that all probes must satisfy.
///
/// A probe performs one bounded, best-effort check against a target and
/// reports zero or more findings. Probes do not abort a scan: the engine
/// folds an `Err` into a synthetic finding via [`Probe::failure_finding`],
/// or drops it silently when that returns `None`.
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, target: &str) -> Result<Vec<Finding>, ProbeError>;

    /// The finding this probe reports for a failed run, if any. Probes whose
    /// failure policy is silent return `None`.
    fn failure_finding(&self, _error: &ProbeError) -> Option<Finding> {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connection timed out")]
    Timeout,
    #[error("tls error: {0}")]
    Tls(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("service detector unavailable: {0}")]
    DetectorUnavailable(String),
}

/// An open port reported by either the service detector or the fallback
/// TCP sweep.
#[derive(Debug, Clone)]
pub struct OpenPort {
    pub port: u16,
    pub service: Option<String>,
    pub product: Option<String>,
    pub version: Option<String>,
}

impl OpenPort {
    pub fn bare(port: u16) -> Self {
        Self {
            port,
            service: None,
            product: None,
            version: None,
        }
    }
}

/// Seam for an advanced port scanner with service/version detection.
///
/// No detector ships by default: when none is configured, or the configured
/// one fails, the port probe silently degrades to a raw TCP-connect sweep.
#[async_trait]
pub trait ServiceDetector: Send + Sync {
    async fn detect(&self, host: &str) -> Result<Vec<OpenPort>, ProbeError>;
}
