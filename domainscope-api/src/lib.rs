//! DOMAINSCOPE API - HTTP Service Layer
//!
//! This crate provides the service around domainscope-core: a PostgreSQL
//! connection pool with runtime schema introspection, the paginated search
//! executor, the external verification orchestrator (reputation + archive
//! lookups with token lifecycle and a TTL result cache), and the Axum REST
//! surface.

pub mod config;
pub mod db;
pub mod error;
pub mod macros;
pub mod routes;
pub mod state;
pub mod verify;

// Re-export commonly used types
pub use config::{ApiConfig, SpamhausConfig, VerifyConfig, WaybackConfig};
pub use db::{DbClient, DbConfig, MetadataCache, SearchPage};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use state::AppState;
pub use verify::{VerificationResult, Verifier};
