//! Probes: the bounded network checks a scan is composed of.
//!
//! Each probe inspects one aspect of a target (TLS posture, exposed ports,
//! web hardening) and reports findings. The CVE matcher is the one
//! non-network stage: it cross-references components the probes surfaced
//! against recent CVE entries.

pub mod cve_match;
pub mod port;
pub mod ssl;
pub mod traits;
pub mod web;

pub use cve_match::{components_from_findings, match_components};
pub use port::PortProbe;
pub use ssl::SslProbe;
pub use traits::{OpenPort, Probe, ProbeError, ServiceDetector};
pub use web::WebProbe;
