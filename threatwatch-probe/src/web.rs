// ---------------------------------------------------------------------------
// Web probe
// ---------------------------------------------------------------------------
//
// One GET against the target, then static analysis of the response: security
// headers, server banner disclosure, and whether plain-http requests get
// upgraded to https.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::debug;

use threatwatch_types::{Finding, ProbeConfig, Severity};

use crate::traits::{Probe, ProbeError};

/// The headers we expect a hardened site to send, with the severity of
/// their absence.
const SECURITY_HEADERS: &[(&str, Severity)] = &[
    ("Strict-Transport-Security", Severity::High),
    ("Content-Security-Policy", Severity::High),
    ("X-Frame-Options", Severity::Medium),
    ("X-Content-Type-Options", Severity::Medium),
    ("X-XSS-Protection", Severity::Low),
];

pub struct WebProbe {
    timeout: Duration,
}

impl WebProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            timeout: config.http_timeout,
        }
    }
}

#[async_trait]
impl Probe for WebProbe {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn run(&self, target: &str) -> Result<Vec<Finding>, ProbeError> {
        let url = if target.contains("://") {
            target.to_string()
        } else {
            format!("https://{target}")
        };
        let started_plain = url.starts_with("http://");

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProbeError::Http(e.to_string()))?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(classify_request_error)?;

        let mut findings = header_findings(response.headers());
        if started_plain && response.url().scheme() == "https" {
            findings.push(Finding {
                title: "HTTP to HTTPS Redirect".into(),
                description: "Plain HTTP requests are redirected to HTTPS".into(),
                severity: Severity::Info,
                affected_component: Some("Web Server".into()),
                ..Finding::default()
            });
        }

        debug!(target, findings = findings.len(), "web probe complete");
        Ok(findings)
    }

    fn failure_finding(&self, error: &ProbeError) -> Option<Finding> {
        Some(match error {
            ProbeError::Tls(msg) => Finding {
                title: "SSL Certificate Error".into(),
                description: format!("SSL error during web request: {msg}"),
                severity: Severity::High,
                affected_component: Some("Web Server".into()),
                recommendation: Some("Check SSL certificate configuration".into()),
                ..Finding::default()
            },
            other => Finding {
                title: "Web Scan Failed".into(),
                description: format!("Could not complete web scan: {other}"),
                severity: Severity::Low,
                affected_component: Some("Web Server".into()),
                ..Finding::default()
            },
        })
    }
}

/// Header analysis on a response: one combined finding for missing security
/// headers (at the worst severity among them) and a disclosure finding for a
/// populated Server banner.
pub fn header_findings(headers: &HeaderMap) -> Vec<Finding> {
    let mut findings = Vec::new();

    let missing: Vec<(&str, Severity)> = SECURITY_HEADERS
        .iter()
        .filter(|(name, _)| !headers.contains_key(*name))
        .copied()
        .collect();

    if !missing.is_empty() {
        let severity = missing
            .iter()
            .map(|(_, s)| *s)
            .max()
            .unwrap_or(Severity::Low);
        let names: Vec<&str> = missing.iter().map(|(name, _)| *name).collect();
        findings.push(Finding {
            title: "Missing Security Headers".into(),
            description: format!("Missing security headers: {}", names.join(", ")),
            severity,
            affected_component: Some("HTTP Headers".into()),
            recommendation: Some("Configure the missing security headers on the web server".into()),
            ..Finding::default()
        });
    }

    if let Some(server) = headers.get("Server").and_then(|v| v.to_str().ok()) {
        if !server.is_empty() {
            findings.push(Finding {
                title: "Server Information Disclosure".into(),
                description: format!("Server header discloses: {server}"),
                severity: Severity::Low,
                affected_component: Some("Web Server".into()),
                recommendation: Some("Suppress or genericize the Server header".into()),
                ..Finding::default()
            });
        }
    }

    findings
}

fn classify_request_error(e: reqwest::Error) -> ProbeError {
    if e.is_timeout() {
        return ProbeError::Timeout;
    }
    let mut source = e.source();
    while let Some(inner) = source {
        if inner.downcast_ref::<rustls::Error>().is_some() {
            return ProbeError::Tls(e.to_string());
        }
        source = inner.source();
    }
    ProbeError::Http(e.to_string())
}
