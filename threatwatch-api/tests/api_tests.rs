// ---------------------------------------------------------------------------
// Integration tests for the REST API
// ---------------------------------------------------------------------------

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use threatwatch_api::state::AppState;
use threatwatch_db::Store;
use threatwatch_engine::ScanRunner;
use threatwatch_probe::{Probe, ProbeError};
use threatwatch_types::{Finding, ProbeConfig, Severity};
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Test harness
// ---------------------------------------------------------------------------

struct FakeProbe {
    name: &'static str,
    findings: Vec<Finding>,
}

#[async_trait]
impl Probe for FakeProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, _target: &str) -> Result<Vec<Finding>, ProbeError> {
        Ok(self.findings.clone())
    }
}

fn finding(title: &str, severity: Severity) -> Finding {
    Finding {
        title: title.into(),
        severity,
        ..Finding::default()
    }
}

fn state_with_probes(
    api_key: Option<&str>,
    ssl: Vec<Finding>,
    port: Vec<Finding>,
    web: Vec<Finding>,
) -> Arc<AppState> {
    let store = Arc::new(Mutex::new(Store::open_in_memory().unwrap()));
    let runner = Arc::new(ScanRunner::with_probes(
        store.clone(),
        ProbeConfig::default(),
        Arc::new(FakeProbe {
            name: "ssl",
            findings: ssl,
        }),
        Arc::new(FakeProbe {
            name: "port",
            findings: port,
        }),
        Arc::new(FakeProbe {
            name: "web",
            findings: web,
        }),
    ));
    Arc::new(AppState::with_runner(
        store,
        runner,
        api_key.map(str::to_string),
    ))
}

fn test_app() -> Router {
    threatwatch_api::build_router(state_with_probes(None, vec![], vec![], vec![]))
}

async fn parse_json(body: Body) -> serde_json::Value {
    let bytes = axum::body::to_bytes(body, 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(
    method: &str,
    uri: &str,
    org_id: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(org_id) = org_id {
        builder = builder.header("X-Organization-Id", org_id);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn create_org(app: &Router, body: serde_json::Value) -> String {
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/orgs", None, Some(body)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    parse_json(resp.into_body()).await["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn create_target(app: &Router, org_id: &str, value: &str) -> String {
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/targets",
            Some(org_id),
            Some(serde_json::json!({
                "name": "main site",
                "target_type": "domain",
                "target_value": value,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    parse_json(resp.into_body()).await["id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// The scan runs in a background task after the 201; poll until it settles.
async fn wait_for_scan(app: &Router, org_id: &str, scan_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let resp = app
            .clone()
            .oneshot(json_request(
                "GET",
                &format!("/api/scans/{scan_id}"),
                Some(org_id),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = parse_json(resp.into_body()).await;
        if json["status"] == "completed" || json["status"] == "failed" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("scan {scan_id} did not settle");
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok() {
    let app = test_app();
    let resp = app
        .oneshot(json_request("GET", "/api/system/health", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = parse_json(resp.into_body()).await;
    assert_eq!(json["status"], "ok");
    // Intentionally minimal: no version or tenant information.
    assert!(json.get("version").is_none());
}

// ---------------------------------------------------------------------------
// Organizations and tenant context
// ---------------------------------------------------------------------------

#[tokio::test]
async fn organization_creation_defaults_to_unlimited() {
    let app = test_app();
    let org_id = create_org(&app, serde_json::json!({"name": "acme"})).await;
    assert!(!org_id.is_empty());

    let resp = app
        .clone()
        .oneshot(json_request("GET", "/api/usage", Some(&org_id), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = parse_json(resp.into_body()).await;
    assert_eq!(json["scans"]["limit"], -1);
    assert_eq!(json["api_requests"]["limit"], -1);
}

#[tokio::test]
async fn blank_organization_name_is_rejected() {
    let app = test_app();
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/orgs",
            None,
            Some(serde_json::json!({"name": "  "})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tenant_routes_require_the_organization_header() {
    let app = test_app();
    let resp = app
        .clone()
        .oneshot(json_request("GET", "/api/targets", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(json_request("GET", "/api/targets", Some("no-such-org"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn target_crud_roundtrip() {
    let app = test_app();
    let org_id = create_org(&app, serde_json::json!({"name": "acme"})).await;
    let target_id = create_target(&app, &org_id, "example.com").await;

    // Duplicate value within the tenant conflicts.
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/targets",
            Some(&org_id),
            Some(serde_json::json!({
                "name": "again",
                "target_type": "domain",
                "target_value": "example.com",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .clone()
        .oneshot(json_request("GET", "/api/targets", Some(&org_id), None))
        .await
        .unwrap();
    let json = parse_json(resp.into_body()).await;
    assert_eq!(json["targets"].as_array().unwrap().len(), 1);

    // Pause the target and switch it to daily scanning.
    let resp = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/targets/{target_id}"),
            Some(&org_id),
            Some(serde_json::json!({"is_active": false, "scan_frequency": "daily"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = parse_json(resp.into_body()).await;
    assert_eq!(json["is_active"], false);
    assert_eq!(json["scan_frequency"], "daily");

    let resp = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/api/targets/{target_id}"),
            Some(&org_id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .oneshot(json_request(
            "GET",
            &format!("/api/targets/{target_id}"),
            Some(&org_id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Scans
// ---------------------------------------------------------------------------

#[tokio::test]
async fn port_scan_completes_with_weighted_risk_score() {
    // Two risky services (high, 15 each) and the open-ports summary
    // (medium, 8): risk score 38.
    let state = state_with_probes(
        None,
        vec![],
        vec![
            finding("Risky Service Exposed: FTP", Severity::High),
            finding("Risky Service Exposed: RDP", Severity::High),
            finding("Open Ports Detected", Severity::Medium),
        ],
        vec![],
    );
    let app = threatwatch_api::build_router(state);
    let org_id = create_org(&app, serde_json::json!({"name": "acme"})).await;
    let target_id = create_target(&app, &org_id, "example.com").await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/scans",
            Some(&org_id),
            Some(serde_json::json!({"target_id": target_id, "scan_type": "port"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = parse_json(resp.into_body()).await;
    assert_eq!(json["status"], "pending");
    assert_eq!(json["usage"]["used"], 1);
    let scan_id = json["scan_id"].as_str().unwrap().to_string();

    let scan = wait_for_scan(&app, &org_id, &scan_id).await;
    assert_eq!(scan["status"], "completed");
    assert_eq!(scan["risk_score"], 38);
    assert_eq!(scan["counts"]["high"], 2);
    assert_eq!(scan["counts"]["medium"], 1);
    assert_eq!(scan["findings"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn scan_for_unknown_target_is_not_found() {
    let app = test_app();
    let org_id = create_org(&app, serde_json::json!({"name": "acme"})).await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/scans",
            Some(&org_id),
            Some(serde_json::json!({"target_id": "nope", "scan_type": "full"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn scan_quota_refusal_is_forbidden_with_usage_numbers() {
    let app = test_app();
    let org_id = create_org(
        &app,
        serde_json::json!({"name": "capped", "max_scans_per_month": 1}),
    )
    .await;
    let target_id = create_target(&app, &org_id, "example.com").await;

    let body = serde_json::json!({"target_id": target_id, "scan_type": "vulnerability"});
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/scans", Some(&org_id), Some(body.clone())))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/scans", Some(&org_id), Some(body)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json = parse_json(resp.into_body()).await;
    assert_eq!(json["error"], "quota_exceeded");
    assert_eq!(json["current_usage"], 1);
    assert_eq!(json["limit"], 1);

    // The refused request created no scan record.
    let resp = app
        .oneshot(json_request("GET", "/api/scans", Some(&org_id), None))
        .await
        .unwrap();
    let json = parse_json(resp.into_body()).await;
    assert_eq!(json["scans"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn scan_list_filters_by_status() {
    let app = test_app();
    let org_id = create_org(&app, serde_json::json!({"name": "acme"})).await;
    let target_id = create_target(&app, &org_id, "example.com").await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/scans",
            Some(&org_id),
            Some(serde_json::json!({"target_id": target_id, "scan_type": "vulnerability"})),
        ))
        .await
        .unwrap();
    let scan_id = parse_json(resp.into_body()).await["scan_id"]
        .as_str()
        .unwrap()
        .to_string();
    wait_for_scan(&app, &org_id, &scan_id).await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "GET",
            "/api/scans?status=completed",
            Some(&org_id),
            None,
        ))
        .await
        .unwrap();
    let json = parse_json(resp.into_body()).await;
    assert_eq!(json["scans"].as_array().unwrap().len(), 1);

    let resp = app
        .oneshot(json_request(
            "GET",
            "/api/scans?status=failed",
            Some(&org_id),
            None,
        ))
        .await
        .unwrap();
    let json = parse_json(resp.into_body()).await;
    assert!(json["scans"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn findings_are_listable_and_reviewable() {
    let state = state_with_probes(
        None,
        vec![],
        vec![],
        vec![finding("Missing Security Headers", Severity::High)],
    );
    let app = threatwatch_api::build_router(state);
    let org_id = create_org(&app, serde_json::json!({"name": "acme"})).await;
    let target_id = create_target(&app, &org_id, "example.com").await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/scans",
            Some(&org_id),
            Some(serde_json::json!({"target_id": target_id, "scan_type": "web"})),
        ))
        .await
        .unwrap();
    let scan_id = parse_json(resp.into_body()).await["scan_id"]
        .as_str()
        .unwrap()
        .to_string();
    wait_for_scan(&app, &org_id, &scan_id).await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "GET",
            "/api/findings?severity=high",
            Some(&org_id),
            None,
        ))
        .await
        .unwrap();
    let json = parse_json(resp.into_body()).await;
    let listed = json["findings"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    let finding_id = listed[0]["id"].as_str().unwrap().to_string();
    assert_eq!(listed[0]["is_resolved"], false);

    let resp = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/findings/{finding_id}"),
            Some(&org_id),
            Some(serde_json::json!({"is_resolved": true})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = parse_json(resp.into_body()).await;
    assert_eq!(json["is_resolved"], true);
    assert!(json["resolved_at"].is_u64());

    // Resolved findings drop out of the unresolved view.
    let resp = app
        .oneshot(json_request(
            "GET",
            "/api/findings?resolved=false",
            Some(&org_id),
            None,
        ))
        .await
        .unwrap();
    let json = parse_json(resp.into_body()).await;
    assert!(json["findings"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Usage metering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_request_quota_applies_to_tenant_routes() {
    let app = test_app();
    let org_id = create_org(
        &app,
        serde_json::json!({"name": "tiny", "max_api_requests_per_month": 2}),
    )
    .await;

    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(json_request("GET", "/api/targets", Some(&org_id), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .oneshot(json_request("GET", "/api/targets", Some(&org_id), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json = parse_json(resp.into_body()).await;
    assert_eq!(json["error"], "quota_exceeded");
    assert_eq!(json["limit"], 2);
}

#[tokio::test]
async fn usage_summary_tracks_scan_consumption() {
    let app = test_app();
    let org_id = create_org(
        &app,
        serde_json::json!({"name": "acme", "max_scans_per_month": 10}),
    )
    .await;
    let target_id = create_target(&app, &org_id, "example.com").await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/scans",
            Some(&org_id),
            Some(serde_json::json!({"target_id": target_id, "scan_type": "vulnerability"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .oneshot(json_request("GET", "/api/usage", Some(&org_id), None))
        .await
        .unwrap();
    let json = parse_json(resp.into_body()).await;
    assert_eq!(json["scans"]["used"], 1);
    assert_eq!(json["scans"]["limit"], 10);
    assert!(json["api_requests"]["used"].as_i64().unwrap() >= 1);
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_key_is_enforced_when_configured() {
    let state = state_with_probes(Some("secret-key"), vec![], vec![], vec![]);
    let app = threatwatch_api::build_router(state);

    // Health stays open.
    let resp = app
        .clone()
        .oneshot(json_request("GET", "/api/system/health", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = serde_json::json!({"name": "acme"});
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/orgs", None, Some(body.clone())))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::post("/api/orgs")
        .header("content-type", "application/json")
        .header("Authorization", "Bearer wrong-key")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::post("/api/orgs")
        .header("content-type", "application/json")
        .header("Authorization", "Bearer secret-key")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}
