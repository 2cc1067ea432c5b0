// ---------------------------------------------------------------------------
// Scan routes
// ---------------------------------------------------------------------------

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use threatwatch_db::ScanFilter;
use threatwatch_engine::CreateScanOutcome;
use threatwatch_types::{ScanRecord, ScanStatus, ScanType};

use crate::error::ApiError;
use crate::routes::tenant;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateScanRequest {
    pub target_id: String,
    pub scan_type: ScanType,
}

#[derive(Debug, Serialize)]
pub struct UsageInfo {
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateScanResponse {
    pub scan_id: String,
    pub status: ScanStatus,
    pub usage: UsageInfo,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListScansQuery {
    pub target_id: Option<String>,
    pub status: Option<ScanStatus>,
    pub scan_type: Option<ScanType>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ScanListResponse {
    pub scans: Vec<ScanRecord>,
}

/// POST /api/scans — gate through the scan quota, create the pending record,
/// and run the scan in the background.
pub async fn create_scan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateScanRequest>,
) -> Result<(StatusCode, Json<CreateScanResponse>), ApiError> {
    let org_id = tenant::org_id(&headers)?;

    let target = {
        let store = state.store.lock().await;
        store.get_target(&org_id, &req.target_id)?
    }
    .ok_or_else(|| ApiError::NotFound(format!("target {} not found", req.target_id)))?;

    match state
        .runner
        .create_scan(&org_id, &req.target_id, req.scan_type)
        .await?
    {
        CreateScanOutcome::Created { scan, usage } => {
            let runner = state.runner.clone();
            let scan_id = scan.id.clone();
            let scan_type = req.scan_type;
            tokio::spawn(async move {
                runner
                    .run_scan(&scan_id, &target.target_value, scan_type)
                    .await;
            });

            info!(scan_id = %scan.id, organization_id = %org_id, %scan_type, "scan accepted");
            Ok((
                StatusCode::CREATED,
                Json(CreateScanResponse {
                    scan_id: scan.id,
                    status: scan.status,
                    usage: UsageInfo {
                        used: usage.used,
                        limit: usage.limit,
                        remaining: usage.remaining(),
                    },
                }),
            ))
        }
        CreateScanOutcome::QuotaExceeded { used, limit } => Err(ApiError::QuotaExceeded {
            message: "Monthly scan limit reached".into(),
            current_usage: used,
            limit,
        }),
        CreateScanOutcome::TargetNotFound => Err(ApiError::NotFound(format!(
            "target {} not found",
            req.target_id
        ))),
    }
}

/// GET /api/scans — newest first, filterable by target, status, and type.
pub async fn list_scans(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListScansQuery>,
) -> Result<Json<ScanListResponse>, ApiError> {
    let org_id = tenant::org_id(&headers)?;
    let filter = ScanFilter {
        target_id: query.target_id,
        status: query.status,
        scan_type: query.scan_type,
        limit: query.limit,
        offset: query.offset,
    };
    let scans = {
        let store = state.store.lock().await;
        store.list_scans(&org_id, &filter)?
    };
    Ok(Json(ScanListResponse { scans }))
}

/// GET /api/scans/{id} — full record including findings.
pub async fn get_scan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ScanRecord>, ApiError> {
    let org_id = tenant::org_id(&headers)?;
    let scan = {
        let store = state.store.lock().await;
        store.get_scan(&org_id, &id)?
    };
    scan.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("scan {id} not found")))
}
