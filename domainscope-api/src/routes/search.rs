//! Domain Search Endpoint
//!
//! POST /api/v1/domains/search: compiles the request criteria against the
//! introspected schema and returns one page of matches with the total
//! count. Criteria the table cannot serve are dropped, never errors.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use domainscope_core::{ColumnRoles, SearchCriteria};

use crate::db::SearchPage;
use crate::error::ApiResult;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Search request: the filter criteria plus pagination.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(flatten)]
    pub criteria: SearchCriteria,
    /// 1-based page number; values below 1 are clamped to 1.
    pub page: Option<i64>,
    /// Page size; clamped into [1, 500], default 50.
    pub page_size: Option<i64>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /api/v1/domains/search
pub async fn search_domains(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchPage>> {
    let metadata = state.metadata.get().await;
    let roles = ColumnRoles::resolve(&metadata);

    let page = state
        .db
        .search(&metadata, &roles, &request.criteria, request.page, request.page_size)
        .await?;

    tracing::debug!(
        page = page.page,
        page_size = page.page_size,
        total = page.total,
        "Search executed"
    );

    Ok(Json(page))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new().route("/domains/search", post(search_domains))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domainscope_core::LifecycleState;

    #[test]
    fn test_request_deserializes_criteria_and_pagination_together() {
        let request: SearchRequest = serde_json::from_str(
            r#"{
                "domainStartsWith": "shop",
                "tlds": ["com", "net"],
                "lifecycleState": "expiring",
                "page": 3,
                "pageSize": 100
            }"#,
        )
        .unwrap();

        assert_eq!(request.criteria.domain_starts_with.as_deref(), Some("shop"));
        assert_eq!(request.criteria.lifecycle_state, Some(LifecycleState::Expiring));
        assert_eq!(request.page, Some(3));
        assert_eq!(request.page_size, Some(100));
    }

    #[test]
    fn test_empty_request_body_is_valid() {
        let request: SearchRequest = serde_json::from_str("{}").unwrap();
        assert!(request.criteria.domain_starts_with.is_none());
        assert!(request.page.is_none());
        assert!(request.page_size.is_none());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"unknownKnob": true, "page": 2}"#).unwrap();
        assert_eq!(request.page, Some(2));
    }
}
