//! Column Role Resolver
//!
//! Maps semantic filtering roles (domain name, creation date, deletion
//! evidence, ...) to physical column names of the introspected table.
//!
//! Resolution is a two-step heuristic, applied independently per role:
//! 1. an ordered list of exact candidate names, matched case-insensitively;
//! 2. the first column (catalog order) whose lowercased name matches a
//!    role-specific regex.
//!
//! A role that resolves to nothing silently disables every criterion that
//! depends on it. That degrade-to-no-op contract is deliberate and must not
//! be turned into an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::schema::TableMetadata;

static RE_DOMAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"domain|host").unwrap());
static RE_TLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|_)tld").unwrap());
static RE_CREATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"creation|created|registered|registration").unwrap());
static RE_EXPIRES: Lazy<Regex> = Lazy::new(|| Regex::new(r"expir|paid_till|valid_until").unwrap());
static RE_SCHEDULED_DELETE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"delete_date|drop|free_date").unwrap());
static RE_DELETED_AT: Lazy<Regex> = Lazy::new(|| Regex::new(r"deleted_at|removed_at").unwrap());
static RE_DELETED_FLAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(is_)?deleted$").unwrap());
static RE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"status|state").unwrap());
static RE_REPUTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"spamhaus|abuse|blacklist|views_total").unwrap());

/// Resolved mapping of semantic roles to physical column names.
///
/// Every field is independently optional; `reputation_counters` collects all
/// matching columns in catalog order rather than the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnRoles {
    pub domain: Option<String>,
    pub tld: Option<String>,
    pub created: Option<String>,
    pub expires: Option<String>,
    pub scheduled_delete: Option<String>,
    pub deleted_at: Option<String>,
    pub deleted_flag: Option<String>,
    pub status: Option<String>,
    pub reputation_counters: Vec<String>,
}

impl ColumnRoles {
    /// Resolve all roles against the given metadata.
    ///
    /// Deterministic for a fixed metadata value: candidate lists are ordered
    /// and the regex fallback scans columns in catalog order.
    pub fn resolve(metadata: &TableMetadata) -> Self {
        Self {
            domain: find_role(
                metadata,
                &["domain", "domain_name", "fqdn", "hostname", "name"],
                &RE_DOMAIN,
            ),
            tld: find_role(metadata, &["tld", "domain_tld", "suffix"], &RE_TLD),
            created: find_role(
                metadata,
                &[
                    "created_at",
                    "creation_date",
                    "created",
                    "registered_at",
                    "registration_date",
                ],
                &RE_CREATED,
            ),
            expires: find_role(
                metadata,
                &[
                    "expires_at",
                    "expiration_date",
                    "expiry_date",
                    "expires",
                    "paid_till",
                ],
                &RE_EXPIRES,
            ),
            scheduled_delete: find_role(
                metadata,
                &["delete_date", "scheduled_delete_at", "drop_date", "free_date"],
                &RE_SCHEDULED_DELETE,
            ),
            deleted_at: find_role(metadata, &["deleted_at", "removed_at"], &RE_DELETED_AT),
            deleted_flag: find_role(
                metadata,
                &["is_deleted", "deleted", "removed"],
                &RE_DELETED_FLAG,
            ),
            status: find_role(metadata, &["status", "state", "domain_status"], &RE_STATUS),
            reputation_counters: metadata
                .columns
                .iter()
                .filter(|c| RE_REPUTATION.is_match(&c.name.to_lowercase()))
                .map(|c| c.name.clone())
                .collect(),
        }
    }

    /// Whether any deletion evidence column exists (flag or tombstone).
    pub fn has_deletion_evidence(&self) -> bool {
        self.deleted_flag.is_some() || self.deleted_at.is_some()
    }
}

/// Resolve one role: exact candidates first, regex fallback second.
fn find_role(metadata: &TableMetadata, candidates: &[&str], fallback: &Regex) -> Option<String> {
    for candidate in candidates {
        if let Some(col) = metadata.column(candidate) {
            return Some(col.name.clone());
        }
    }

    metadata
        .columns
        .iter()
        .find(|c| fallback.is_match(&c.name.to_lowercase()))
        .map(|c| c.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableColumn;

    fn meta(names: &[&str]) -> TableMetadata {
        TableMetadata {
            schema_name: "public".to_string(),
            table_name: "domains".to_string(),
            columns: names
                .iter()
                .map(|n| TableColumn {
                    name: n.to_string(),
                    data_type: "text".to_string(),
                    udt_name: "text".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_exact_candidate_wins_over_regex() {
        // "hostname" matches the regex, but "domain" is an exact candidate.
        let roles = ColumnRoles::resolve(&meta(&["hostname", "domain"]));
        assert_eq!(roles.domain.as_deref(), Some("domain"));
    }

    #[test]
    fn test_regex_fallback_takes_first_in_catalog_order() {
        let roles = ColumnRoles::resolve(&meta(&["registration_ts", "creation_ts"]));
        assert_eq!(roles.created.as_deref(), Some("registration_ts"));
    }

    #[test]
    fn test_candidate_match_is_case_insensitive() {
        let roles = ColumnRoles::resolve(&meta(&["Expiration_Date"]));
        assert_eq!(roles.expires.as_deref(), Some("Expiration_Date"));
    }

    #[test]
    fn test_missing_role_resolves_to_none() {
        let roles = ColumnRoles::resolve(&meta(&["domain"]));
        assert!(roles.tld.is_none());
        assert!(roles.created.is_none());
        assert!(roles.deleted_flag.is_none());
        assert!(roles.reputation_counters.is_empty());
    }

    #[test]
    fn test_deleted_flag_regex_is_anchored() {
        // "deleted_domains_count" must not resolve as a deleted flag.
        let roles = ColumnRoles::resolve(&meta(&["deleted_domains_count"]));
        assert!(roles.deleted_flag.is_none());
    }

    #[test]
    fn test_reputation_counters_collect_all_matches() {
        let roles = ColumnRoles::resolve(&meta(&[
            "spamhaus_hits",
            "domain",
            "abuse_score",
            "views_total",
        ]));
        assert_eq!(
            roles.reputation_counters,
            vec!["spamhaus_hits", "abuse_score", "views_total"]
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let m = meta(&["fqdn", "paid_till", "status", "drop_date"]);
        assert_eq!(ColumnRoles::resolve(&m), ColumnRoles::resolve(&m));
    }

    #[test]
    fn test_empty_metadata_resolves_nothing() {
        let roles = ColumnRoles::resolve(&TableMetadata::empty("public", "domains"));
        assert_eq!(roles, ColumnRoles::default());
    }
}
