//! Shared application state for Axum routers.

use std::sync::Arc;

use crate::db::{DbClient, MetadataCache};
use crate::verify::Verifier;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Database client for the configured domain table.
    pub db: DbClient,
    /// Lazily introspected table metadata, resolved at most once.
    pub metadata: MetadataCache,
    /// Verification orchestrator with its TTL result cache.
    pub verifier: Arc<Verifier>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(db: DbClient, metadata: MetadataCache, verifier: Arc<Verifier>) -> Self {
        Self {
            db,
            metadata,
            verifier,
            start_time: std::time::Instant::now(),
        }
    }
}

crate::impl_from_ref!(DbClient, db);
crate::impl_from_ref!(MetadataCache, metadata);
crate::impl_from_ref!(Arc<Verifier>, verifier);
