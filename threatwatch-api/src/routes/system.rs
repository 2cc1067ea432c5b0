// ---------------------------------------------------------------------------
// System routes: health check + usage summary
// ---------------------------------------------------------------------------

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use threatwatch_db::current_period;
use threatwatch_types::MetricType;

use crate::error::ApiError;
use crate::routes::tenant;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint — intentionally minimal to avoid leaking version or
/// tenant information to unauthenticated callers.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

#[derive(Debug, Serialize)]
pub struct MetricUsage {
    pub used: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct UsageSummary {
    pub organization_id: String,
    pub year: i32,
    pub month: u32,
    pub scans: MetricUsage,
    pub api_requests: MetricUsage,
}

/// GET /api/usage — current-month consumption against plan limits.
pub async fn usage_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UsageSummary>, ApiError> {
    let org_id = tenant::org_id(&headers)?;
    let (year, month) = current_period();

    let store = state.store.lock().await;
    let org = store
        .get_organization(&org_id)?
        .ok_or_else(|| ApiError::NotFound(format!("organization {org_id} not found")))?;
    let scans_used = store.current_usage(&org_id, MetricType::Scan, year, month)?;
    let api_used = store.current_usage(&org_id, MetricType::ApiRequest, year, month)?;

    Ok(Json(UsageSummary {
        organization_id: org.id,
        year,
        month,
        scans: MetricUsage {
            used: scans_used,
            limit: org.max_scans_per_month,
        },
        api_requests: MetricUsage {
            used: api_used,
            limit: org.max_api_requests_per_month,
        },
    }))
}
