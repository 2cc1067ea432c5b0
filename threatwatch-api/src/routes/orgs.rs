// ---------------------------------------------------------------------------
// Organization routes
// ---------------------------------------------------------------------------

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use threatwatch_types::{Organization, UNLIMITED};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrgRequest {
    pub name: String,
    #[serde(default = "unlimited")]
    pub max_scans_per_month: i64,
    #[serde(default = "unlimited")]
    pub max_api_requests_per_month: i64,
}

fn unlimited() -> i64 {
    UNLIMITED
}

pub async fn create_organization(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrgRequest>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("organization name required".into()));
    }
    let org = {
        let store = state.store.lock().await;
        store.create_organization(
            req.name.trim(),
            req.max_scans_per_month,
            req.max_api_requests_per_month,
        )?
    };
    info!(organization_id = %org.id, name = %org.name, "organization created");
    Ok((StatusCode::CREATED, Json(org)))
}
