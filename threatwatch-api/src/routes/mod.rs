// ---------------------------------------------------------------------------
// Route registration
// ---------------------------------------------------------------------------

mod findings;
mod orgs;
mod scans;
mod system;
mod targets;
pub(crate) mod tenant;

use std::sync::Arc;

use axum::http::HeaderName;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let health_route = Router::new().route("/api/system/health", get(system::health_check));

    // Organization creation is an operator action: authenticated, but not
    // scoped to a tenant.
    let admin_routes = Router::new().route("/api/orgs", post(orgs::create_organization));

    // Everything else runs in a tenant context: X-Organization-Id required,
    // API-request quota consumed per call.
    let tenant_routes = Router::new()
        .route(
            "/api/targets",
            post(targets::create_target).get(targets::list_targets),
        )
        .route(
            "/api/targets/{id}",
            get(targets::get_target)
                .patch(targets::update_target)
                .delete(targets::delete_target),
        )
        .route("/api/scans", post(scans::create_scan).get(scans::list_scans))
        .route("/api/scans/{id}", get(scans::get_scan))
        .route("/api/findings", get(findings::list_findings))
        .route("/api/findings/{id}", patch(findings::review_finding))
        .route("/api/usage", get(system::usage_summary))
        .layer(from_fn_with_state(state.clone(), tenant::tenant_middleware));

    let api_routes = admin_routes.merge(tenant_routes);

    // Apply auth middleware only if api_key_hash is configured
    let api_routes = if state.api_key_hash.is_some() {
        api_routes.layer(from_fn_with_state(state.clone(), auth_middleware))
    } else {
        api_routes
    };

    // The API is expected to sit behind a reverse proxy in production; CORS
    // here is permissive on origin and strict on methods/headers.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            HeaderName::from_static("x-organization-id"),
        ])
        .max_age(std::time::Duration::from_secs(3600));

    health_route
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(1024 * 1024)) // 1 MB (request bodies are small)
        .with_state(state)
}
