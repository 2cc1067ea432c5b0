// ---------------------------------------------------------------------------
// SSL/TLS probe
// ---------------------------------------------------------------------------
//
// Connects to port 443 and inspects the negotiated session and the peer
// certificate. Certificate validation is intentionally disabled: the point is
// to inspect whatever the server presents, not to refuse to look at it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{AlertDescription, ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use threatwatch_types::{now_ms, Finding, ProbeConfig, Severity};

use crate::traits::{Probe, ProbeError};

const TLS_PORT: u16 = 443;

pub struct SslProbe {
    timeout: Duration,
}

impl SslProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            timeout: config.ssl_timeout,
        }
    }

    async fn handshake(
        &self,
        host: &str,
    ) -> Result<tokio_rustls::client::TlsStream<TcpStream>, HandshakeFailure> {
        let server_name = ServerName::try_from(host.to_string()).map_err(|_| {
            HandshakeFailure::Other(ProbeError::InvalidTarget(format!(
                "not a valid server name: {host}"
            )))
        })?;

        let tcp = tokio::time::timeout(self.timeout, TcpStream::connect((host, TLS_PORT)))
            .await
            .map_err(|_| HandshakeFailure::Other(ProbeError::Timeout))?
            .map_err(|e| HandshakeFailure::Other(ProbeError::Io(e)))?;

        let connector = TlsConnector::from(Arc::new(inspection_client_config()));
        tokio::time::timeout(self.timeout, connector.connect(server_name, tcp))
            .await
            .map_err(|_| HandshakeFailure::Other(ProbeError::Timeout))?
            .map_err(classify_handshake_error)
    }
}

/// A handshake that did not produce a session. The weak-version refusal is
/// split out because it is a finding, not a probe failure.
enum HandshakeFailure {
    WeakTls(String),
    Other(ProbeError),
}

#[async_trait]
impl Probe for SslProbe {
    fn name(&self) -> &'static str {
        "ssl"
    }

    async fn run(&self, target: &str) -> Result<Vec<Finding>, ProbeError> {
        let stream = match self.handshake(target).await {
            Ok(stream) => stream,
            // A server that can only speak TLS 1.0/1.1 cannot complete a
            // handshake with us; that is the weak-version condition, not a
            // connection failure. A completed handshake is always 1.2+.
            Err(HandshakeFailure::WeakTls(detail)) => {
                return Ok(vec![weak_tls_finding(&detail)]);
            }
            Err(HandshakeFailure::Other(e)) => return Err(e),
        };

        let (_, session) = stream.get_ref();
        let mut findings = Vec::new();

        if let Some(certs) = session.peer_certificates() {
            if let Some(leaf) = certs.first() {
                findings.extend(inspect_certificate(leaf)?);
            }
        }

        debug!(target, findings = findings.len(), "ssl probe complete");
        Ok(findings)
    }

    fn failure_finding(&self, error: &ProbeError) -> Option<Finding> {
        Some(match error {
            ProbeError::Tls(msg) => Finding {
                title: "SSL/TLS Configuration Error".into(),
                description: format!("SSL error: {msg}"),
                severity: Severity::High,
                affected_component: Some("SSL/TLS".into()),
                recommendation: Some("Check SSL certificate configuration".into()),
                ..Finding::default()
            },
            other => Finding {
                title: "SSL/TLS Connection Failed".into(),
                description: format!("Could not establish SSL connection: {other}"),
                severity: Severity::High,
                affected_component: Some("SSL/TLS".into()),
                recommendation: Some("Check SSL certificate configuration".into()),
                ..Finding::default()
            },
        })
    }
}

/// Parse the leaf certificate and report expiry and chain findings.
fn inspect_certificate(der: &CertificateDer<'_>) -> Result<Vec<Finding>, ProbeError> {
    let (_, cert) = X509Certificate::from_der(der.as_ref())
        .map_err(|e| ProbeError::Tls(format!("certificate parse error: {e}")))?;

    let mut findings = Vec::new();

    let now_secs = (now_ms() / 1000) as i64;
    let days_until_expiry = (cert.validity().not_after.timestamp() - now_secs) / 86_400;
    if let Some(finding) = expiry_finding(days_until_expiry) {
        findings.push(finding);
    }

    if cert.issuer().iter().next().is_none() {
        findings.push(Finding {
            title: "SSL Certificate Chain Issue".into(),
            description: "Certificate chain may be incomplete".into(),
            severity: Severity::Medium,
            affected_component: Some("SSL Certificate".into()),
            recommendation: Some("Ensure complete certificate chain is configured".into()),
            ..Finding::default()
        });
    }

    Ok(findings)
}

/// Expiry policy: certificates more than 30 days out are fine; inside 30 days
/// the severity is medium under 7 days and low otherwise.
pub fn expiry_finding(days_until_expiry: i64) -> Option<Finding> {
    if days_until_expiry >= 30 {
        return None;
    }
    let severity = if days_until_expiry < 7 {
        Severity::Medium
    } else {
        Severity::Low
    };
    Some(Finding {
        title: "SSL Certificate Expiring Soon".into(),
        description: format!("Certificate expires in {days_until_expiry} days"),
        severity,
        affected_component: Some("SSL Certificate".into()),
        recommendation: Some("Renew SSL certificate before expiration".into()),
        ..Finding::default()
    })
}

fn weak_tls_finding(detail: &str) -> Finding {
    Finding {
        title: "Weak TLS Version".into(),
        description: format!("Using deprecated TLS version: {detail}"),
        severity: Severity::High,
        affected_component: Some("TLS Protocol".into()),
        recommendation: Some("Upgrade to TLS 1.2 or higher".into()),
        ..Finding::default()
    }
}

/// The two shapes a 1.0/1.1-only server takes from our side: rustls gives up
/// during version negotiation (`PeerIncompatible`), or the server answers our
/// 1.2+ hello with a protocol_version alert.
fn is_weak_tls_refusal(e: &rustls::Error) -> bool {
    matches!(
        e,
        rustls::Error::PeerIncompatible(_)
            | rustls::Error::AlertReceived(AlertDescription::ProtocolVersion)
    )
}

fn classify_handshake_error(e: std::io::Error) -> HandshakeFailure {
    let tls = e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>());
    let weak = tls.map_or(false, is_weak_tls_refusal);
    let msg = tls.map(|tls| tls.to_string());
    match (weak, msg) {
        (true, Some(msg)) => HandshakeFailure::WeakTls(msg),
        (false, Some(msg)) => HandshakeFailure::Other(ProbeError::Tls(msg)),
        _ => HandshakeFailure::Other(ProbeError::Io(e)),
    }
}

/// A client config that records whatever certificate the peer presents
/// without validating it.
fn inspection_client_config() -> ClientConfig {
    ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert::new()))
        .with_no_client_auth()
}

#[derive(Debug)]
struct AcceptAnyCert(Arc<rustls::crypto::CryptoProvider>);

impl AcceptAnyCert {
    fn new() -> Self {
        Self(Arc::new(rustls::crypto::ring::default_provider()))
    }
}

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0
            .signature_verification_algorithms
            .supported_schemes()
    }
}
