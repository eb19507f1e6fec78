//! Schema Capability Discovery
//!
//! Exposes the introspected table shape and which filter capabilities it
//! supports, so clients can hide controls the backing table cannot serve.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use domainscope_core::{ColumnRoles, TableColumn};

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
    pub schema_name: String,
    pub table_name: String,
    pub columns: Vec<TableColumn>,
    pub roles: ColumnRoles,
    pub capabilities: Capabilities,
}

/// Which criteria the resolved roles can actually serve. A criterion whose
/// capability is false is silently dropped by the compiler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub domain_patterns: bool,
    pub tld_filter: bool,
    pub created_range: bool,
    pub age_range: bool,
    pub expires_range: bool,
    pub lifecycle_states: bool,
    pub safety_filters: bool,
}

impl Capabilities {
    fn from_roles(roles: &ColumnRoles) -> Self {
        Self {
            domain_patterns: roles.domain.is_some(),
            tld_filter: roles.tld.is_some() || roles.domain.is_some(),
            created_range: roles.created.is_some(),
            age_range: roles.created.is_some(),
            expires_range: roles.expires.is_some(),
            lifecycle_states: roles.has_deletion_evidence()
                || roles.status.is_some()
                || roles.expires.is_some()
                || roles.scheduled_delete.is_some(),
            safety_filters: !roles.reputation_counters.is_empty(),
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/v1/schema - Introspected table shape and supported filters
pub async fn get_schema(State(state): State<AppState>) -> impl IntoResponse {
    let metadata = state.metadata.get().await;
    let roles = ColumnRoles::resolve(&metadata);
    let capabilities = Capabilities::from_roles(&roles);

    Json(SchemaResponse {
        schema_name: metadata.schema_name,
        table_name: metadata.table_name,
        columns: metadata.columns,
        roles,
        capabilities,
    })
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new().route("/schema", get(get_schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domainscope_core::TableMetadata;

    fn text_col(name: &str) -> TableColumn {
        TableColumn {
            name: name.to_string(),
            data_type: "text".to_string(),
            udt_name: "text".to_string(),
        }
    }

    #[test]
    fn test_capabilities_for_empty_catalog() {
        let roles = ColumnRoles::resolve(&TableMetadata::empty("public", "domains"));
        let caps = Capabilities::from_roles(&roles);

        assert!(!caps.domain_patterns);
        assert!(!caps.tld_filter);
        assert!(!caps.lifecycle_states);
        assert!(!caps.safety_filters);
    }

    #[test]
    fn test_tld_capability_falls_back_to_domain_column() {
        let metadata = TableMetadata {
            schema_name: "public".to_string(),
            table_name: "domains".to_string(),
            columns: vec![text_col("domain")],
        };
        let roles = ColumnRoles::resolve(&metadata);
        let caps = Capabilities::from_roles(&roles);

        assert!(caps.domain_patterns);
        assert!(caps.tld_filter);
        assert!(!caps.created_range);
    }

    #[test]
    fn test_status_column_enables_lifecycle_states() {
        let metadata = TableMetadata {
            schema_name: "public".to_string(),
            table_name: "domains".to_string(),
            columns: vec![text_col("domain"), text_col("status")],
        };
        let roles = ColumnRoles::resolve(&metadata);
        let caps = Capabilities::from_roles(&roles);

        assert!(caps.lifecycle_states);
    }
}
