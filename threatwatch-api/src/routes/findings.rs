// ---------------------------------------------------------------------------
// Finding review routes
// ---------------------------------------------------------------------------

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use threatwatch_db::{FindingFilter, FindingReview};
use threatwatch_types::{now_ms, FindingRecord, Severity};

use crate::error::ApiError;
use crate::routes::tenant;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct ListFindingsQuery {
    pub scan_id: Option<String>,
    pub severity: Option<Severity>,
    pub resolved: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FindingListResponse {
    pub findings: Vec<FindingRecord>,
}

/// Review flags are the only mutable part of a finding.
#[derive(Debug, Deserialize)]
pub struct ReviewFindingRequest {
    pub is_false_positive: Option<bool>,
    pub is_resolved: Option<bool>,
}

pub async fn list_findings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListFindingsQuery>,
) -> Result<Json<FindingListResponse>, ApiError> {
    let org_id = tenant::org_id(&headers)?;
    let filter = FindingFilter {
        scan_id: query.scan_id,
        severity: query.severity,
        resolved: query.resolved,
        limit: query.limit,
        offset: query.offset,
    };
    let findings = {
        let store = state.store.lock().await;
        store.list_findings(&org_id, &filter)?
    };
    Ok(Json(FindingListResponse { findings }))
}

pub async fn review_finding(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ReviewFindingRequest>,
) -> Result<Json<FindingRecord>, ApiError> {
    let org_id = tenant::org_id(&headers)?;
    let review = FindingReview {
        is_false_positive: req.is_false_positive,
        is_resolved: req.is_resolved,
    };
    let finding = {
        let store = state.store.lock().await;
        store.review_finding(&org_id, &id, &review, now_ms())?
    };
    finding
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("finding {id} not found")))
}
