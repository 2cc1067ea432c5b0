// ---------------------------------------------------------------------------
// API-key authentication
// ---------------------------------------------------------------------------

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

/// Bearer-token gate in front of the API routes.
///
/// Without `--api-key` the server runs open and this layer passes everything
/// through. With a key configured, requests must carry
/// `Authorization: Bearer <key>`; the presented key is hashed and compared
/// against the stored digest in constant time, so neither the comparison nor
/// a key-length difference leaks timing.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected_hash) = state.api_key_hash.as_ref() else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));
    let Some(token) = token else {
        return Err(ApiError::Unauthorized(
            "Bearer token required in Authorization header".into(),
        ));
    };

    let presented = Sha256::digest(token.as_bytes());
    if bool::from(expected_hash.ct_eq(presented.as_slice())) {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::Unauthorized("Invalid API key".into()))
    }
}
