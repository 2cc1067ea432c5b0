// ---------------------------------------------------------------------------
// Tenant context middleware
// ---------------------------------------------------------------------------
//
// Every tenant-scoped route requires an X-Organization-Id header naming an
// existing organization, and consumes one unit of the organization's monthly
// API-request quota before the handler runs.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use threatwatch_db::current_period;
use threatwatch_types::MetricType;

use crate::error::ApiError;
use crate::state::AppState;

pub const ORG_HEADER: &str = "x-organization-id";

/// Extract the organization id from the request headers.
pub fn org_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(ORG_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("X-Organization-Id header required".into()))
}

pub async fn tenant_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let org_id = org_id(request.headers())?;

    let usage = {
        let store = state.store.lock().await;
        let Some(org) = store.get_organization(&org_id)? else {
            return Err(ApiError::NotFound(format!(
                "organization {org_id} not found"
            )));
        };
        let (year, month) = current_period();
        store.try_consume(&org, MetricType::ApiRequest, year, month)?
    };

    if !usage.allowed {
        return Err(ApiError::QuotaExceeded {
            message: "Monthly API request limit reached".into(),
            current_usage: usage.used,
            limit: usage.limit,
        });
    }

    Ok(next.run(request).await)
}
