//! Search Criteria Types
//!
//! The wire shape of a domain search request. Every field is independently
//! optional; present fields are AND-combined by the compiler. Fields whose
//! backing column does not exist in the introspected table are silently
//! ignored at compile time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Derived lifecycle state of a domain, computed from whichever subset of
/// lifecycle-related columns the table actually has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Active,
    Expiring,
    Deleted,
}

/// A flat, fully optional filter specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchCriteria {
    /// Case-insensitive prefix match on the domain name.
    pub domain_starts_with: Option<String>,
    /// Case-insensitive suffix match on the domain name.
    pub domain_ends_with: Option<String>,
    /// TLD set filter; terms are normalized (lowercased, leading dot stripped).
    pub tlds: Vec<String>,

    pub lifecycle_state: Option<LifecycleState>,
    /// Window for the `expiring` state, in days from now. Default 30, min 1.
    pub expiring_within_days: Option<i64>,

    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    /// Domain age bounds in years, converted to creation-date comparisons.
    pub age_years_from: Option<i64>,
    pub age_years_to: Option<i64>,
    pub expires_from: Option<NaiveDate>,
    pub expires_to: Option<NaiveDate>,

    // Free-text contains filters. Applied only when the identically named
    // column exists in the catalog; no heuristic fallback for these.
    pub country: Option<String>,
    pub registrar: Option<String>,
    pub technology: Option<String>,
    pub response_status: Option<String>,

    pub detected_hosts_min: Option<i64>,
    pub detected_hosts_max: Option<i64>,

    /// Keep only domains with no recorded reputation-list hits.
    pub safe_spamhaus_only: bool,
    /// Keep only domains with no recorded total views.
    pub safe_views_total_only: bool,
}
