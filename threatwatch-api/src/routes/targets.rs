// ---------------------------------------------------------------------------
// Target CRUD routes
// ---------------------------------------------------------------------------

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use threatwatch_db::TargetUpdate;
use threatwatch_types::{ScanFrequency, ScanTarget, TargetType};

use crate::error::ApiError;
use crate::routes::tenant;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTargetRequest {
    pub name: String,
    pub target_type: TargetType,
    pub target_value: String,
    #[serde(default = "default_frequency")]
    pub scan_frequency: ScanFrequency,
}

fn default_frequency() -> ScanFrequency {
    ScanFrequency::Weekly
}

#[derive(Debug, Serialize)]
pub struct TargetListResponse {
    pub targets: Vec<ScanTarget>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTargetRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub scan_frequency: Option<ScanFrequency>,
}

pub async fn create_target(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateTargetRequest>,
) -> Result<(StatusCode, Json<ScanTarget>), ApiError> {
    let org_id = tenant::org_id(&headers)?;
    let value = req.target_value.trim();
    if req.name.trim().is_empty() || value.is_empty() {
        return Err(ApiError::BadRequest(
            "target name and value are required".into(),
        ));
    }

    let target = {
        let store = state.store.lock().await;
        store.create_target(
            &org_id,
            req.name.trim(),
            req.target_type,
            value,
            req.scan_frequency,
        )?
    };
    info!(target_id = %target.id, organization_id = %org_id, "target created");
    Ok((StatusCode::CREATED, Json(target)))
}

pub async fn list_targets(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TargetListResponse>, ApiError> {
    let org_id = tenant::org_id(&headers)?;
    let targets = {
        let store = state.store.lock().await;
        store.list_targets(&org_id)?
    };
    Ok(Json(TargetListResponse { targets }))
}

pub async fn get_target(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ScanTarget>, ApiError> {
    let org_id = tenant::org_id(&headers)?;
    let target = {
        let store = state.store.lock().await;
        store.get_target(&org_id, &id)?
    };
    target
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("target {id} not found")))
}

pub async fn update_target(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateTargetRequest>,
) -> Result<Json<ScanTarget>, ApiError> {
    let org_id = tenant::org_id(&headers)?;
    let update = TargetUpdate {
        name: req.name,
        is_active: req.is_active,
        scan_frequency: req.scan_frequency,
    };
    let target = {
        let store = state.store.lock().await;
        store.update_target(&org_id, &id, &update)?
    };
    target
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("target {id} not found")))
}

pub async fn delete_target(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let org_id = tenant::org_id(&headers)?;
    let deleted = {
        let store = state.store.lock().await;
        store.delete_target(&org_id, &id)?
    };
    if deleted {
        info!(target_id = %id, organization_id = %org_id, "target deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("target {id} not found")))
    }
}
