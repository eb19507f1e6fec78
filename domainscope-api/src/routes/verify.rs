//! Domain Verification Endpoint
//!
//! GET /api/v1/domains/{domain}/verify: runs the reputation and archive
//! checks for one domain and returns the merged result. Invalid domain
//! input is a 400; upstream failures surface inside the result body.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::verify::VerificationResult;

/// GET /api/v1/domains/{domain}/verify
pub async fn verify_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> ApiResult<Json<VerificationResult>> {
    let result = state.verifier.check(&domain).await?;

    tracing::debug!(
        domain = %result.domain,
        cached = result.cached,
        has_error = result.has_error(),
        "Verification completed"
    );

    Ok(Json(result))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/domains/:domain/verify", get(verify_domain))
}
