//! Criteria Compiler
//!
//! Translates a [`SearchCriteria`] plus the resolved [`ColumnRoles`] into
//! WHERE-clause fragments on a [`QueryBuilder`]. Each criterion compiles
//! independently to zero or one fragment; a criterion whose backing column
//! is missing is dropped silently, never raised as an error.
//!
//! The lifecycle sub-compiler derives deletion evidence with a fixed
//! precedence: boolean deleted flag, textual/numeric deleted flag,
//! deleted-at tombstone, and only as a last resort a status-text pattern
//! match. That ordering is part of the contract.

use crate::criteria::{LifecycleState, SearchCriteria};
use crate::query::{quote_ident, QueryBuilder, SqlValue};
use crate::roles::ColumnRoles;
use crate::schema::TableMetadata;

/// Status values that mark a domain as live.
const ACTIVE_STATUSES: [&str; 3] = ["active", "ok", "registered"];

/// Status patterns that mark a domain as gone, used only when no dedicated
/// deletion column exists.
const DELETED_STATUS_PATTERNS: [&str; 3] = ["%deleted%", "%dropped%", "%removed%"];

/// Default and minimum window for the `expiring` lifecycle state.
const DEFAULT_EXPIRING_DAYS: i64 = 30;

/// Compile all criteria into fragments on the builder.
///
/// Evaluation order is fixed for reproducible fragment lists; it has no
/// effect on query semantics (fragments are AND-combined).
pub fn compile_criteria(
    criteria: &SearchCriteria,
    roles: &ColumnRoles,
    metadata: &TableMetadata,
    qb: &mut QueryBuilder,
) {
    compile_domain_patterns(criteria, roles, qb);
    compile_tlds(criteria, roles, qb);
    compile_lifecycle(criteria, roles, metadata, qb);
    compile_created_range(criteria, roles, qb);
    compile_age_range(criteria, roles, qb);
    compile_expires_range(criteria, roles, qb);
    compile_contains_filters(criteria, metadata, qb);
    compile_detected_hosts(criteria, metadata, qb);
    compile_safety_filters(criteria, roles, metadata, qb);
}

/// Normalize a TLD list: trim, lowercase, strip one leading dot, drop empties.
pub fn normalize_tlds(tlds: &[String]) -> Vec<String> {
    tlds.iter()
        .map(|t| t.trim().trim_start_matches('.').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn compile_domain_patterns(criteria: &SearchCriteria, roles: &ColumnRoles, qb: &mut QueryBuilder) {
    let Some(domain_col) = &roles.domain else {
        return;
    };
    let col = quote_ident(domain_col);

    if let Some(prefix) = non_empty(&criteria.domain_starts_with) {
        qb.push(
            &format!("lower({col}) LIKE lower({{}})"),
            vec![SqlValue::Text(format!("{prefix}%"))],
        );
    }
    if let Some(suffix) = non_empty(&criteria.domain_ends_with) {
        qb.push(
            &format!("lower({col}) LIKE lower({{}})"),
            vec![SqlValue::Text(format!("%{suffix}"))],
        );
    }
}

fn compile_tlds(criteria: &SearchCriteria, roles: &ColumnRoles, qb: &mut QueryBuilder) {
    let tlds = normalize_tlds(&criteria.tlds);
    if tlds.is_empty() {
        return;
    }

    if let Some(tld_col) = &roles.tld {
        // Exact match against the dedicated TLD column.
        let col = quote_ident(tld_col);
        let placeholders: Vec<String> = tlds
            .into_iter()
            .map(|t| qb.bind(SqlValue::Text(t)))
            .collect();
        qb.push_fragment(format!("lower({col}) IN ({})", placeholders.join(", ")));
    } else if let Some(domain_col) = &roles.domain {
        // Fallback: suffix pattern per term on the domain column.
        let col = quote_ident(domain_col);
        let parts: Vec<String> = tlds
            .into_iter()
            .map(|t| {
                let placeholder = qb.bind(SqlValue::Text(format!("%.{t}")));
                format!("lower({col}) LIKE {placeholder}")
            })
            .collect();
        qb.push_fragment(format!("({})", parts.join(" OR ")));
    }
}

/// Build the deletion-evidence predicate, binding any parameters it needs.
///
/// Precedence: deleted flag (boolean, else coerced text), deleted-at
/// tombstone; if neither column exists, status pattern match as a last
/// resort. `None` means deletion is underivable for this table.
fn deleted_evidence(
    roles: &ColumnRoles,
    metadata: &TableMetadata,
    qb: &mut QueryBuilder,
) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(flag) = &roles.deleted_flag {
        let col = quote_ident(flag);
        if metadata.is_boolean(flag) {
            parts.push(format!("{col} IS TRUE"));
        } else {
            parts.push(format!(
                "COALESCE(NULLIF({col}::text, ''), '0')::numeric > 0"
            ));
        }
    }
    if let Some(deleted_at) = &roles.deleted_at {
        parts.push(format!("{} IS NOT NULL", quote_ident(deleted_at)));
    }

    if parts.is_empty() {
        let status = roles.status.as_ref()?;
        let col = quote_ident(status);
        let patterns: Vec<String> = DELETED_STATUS_PATTERNS
            .iter()
            .map(|p| {
                let placeholder = qb.bind(SqlValue::Text((*p).to_string()));
                format!("{col} ILIKE {placeholder}")
            })
            .collect();
        return Some(format!("({})", patterns.join(" OR ")));
    }

    if parts.len() == 1 {
        Some(parts.remove(0))
    } else {
        Some(format!("({})", parts.join(" OR ")))
    }
}

fn compile_lifecycle(
    criteria: &SearchCriteria,
    roles: &ColumnRoles,
    metadata: &TableMetadata,
    qb: &mut QueryBuilder,
) {
    match criteria.lifecycle_state {
        None => {}
        Some(LifecycleState::Deleted) => {
            if let Some(evidence) = deleted_evidence(roles, metadata, qb) {
                qb.push_fragment(evidence);
            }
        }
        Some(LifecycleState::Active) => {
            let evidence = deleted_evidence(roles, metadata, qb);

            let mut live_parts = Vec::new();
            if let Some(expires) = &roles.expires {
                live_parts.push(format!("{} >= CURRENT_DATE", quote_ident(expires)));
            }
            if let Some(status) = &roles.status {
                let col = quote_ident(status);
                let exact: Vec<String> = ACTIVE_STATUSES
                    .iter()
                    .map(|s| qb.bind(SqlValue::Text((*s).to_string())))
                    .collect();
                let pattern = qb.bind(SqlValue::Text("%active%".to_string()));
                live_parts.push(format!(
                    "lower({col}) IN ({}) OR {col} ILIKE {pattern}",
                    exact.join(", ")
                ));
            }
            let live = (!live_parts.is_empty()).then(|| format!("({})", live_parts.join(" OR ")));

            match (evidence, live) {
                (Some(evidence), Some(live)) => {
                    qb.push_fragment(format!("NOT ({evidence}) AND {live}"));
                }
                (Some(evidence), None) => qb.push_fragment(format!("NOT ({evidence})")),
                (None, Some(live)) => qb.push_fragment(live),
                (None, None) => {}
            }
        }
        Some(LifecycleState::Expiring) => {
            // Scheduled-delete date preferred over expiration date. No date
            // column at all means the state is not derivable here, so the
            // criterion drops before binding anything.
            let Some(date_col) = roles
                .scheduled_delete
                .as_ref()
                .or(roles.expires.as_ref())
            else {
                return;
            };

            let evidence = deleted_evidence(roles, metadata, qb);

            let col = quote_ident(date_col);
            let days = criteria
                .expiring_within_days
                .unwrap_or(DEFAULT_EXPIRING_DAYS)
                .max(1);
            let placeholder = qb.bind(SqlValue::Int(days));
            let window = format!(
                "{col} >= CURRENT_DATE AND {col} < CURRENT_DATE + make_interval(days => {placeholder}::int)"
            );

            match evidence {
                Some(evidence) => qb.push_fragment(format!("NOT ({evidence}) AND ({window})")),
                None => qb.push_fragment(format!("({window})")),
            }
        }
    }
}

fn compile_created_range(criteria: &SearchCriteria, roles: &ColumnRoles, qb: &mut QueryBuilder) {
    let Some(created) = &roles.created else {
        return;
    };
    let col = quote_ident(created);

    if let Some(from) = criteria.created_from {
        qb.push(&format!("{col} >= {{}}"), vec![SqlValue::Date(from)]);
    }
    if let Some(to) = criteria.created_to {
        qb.push(&format!("{col} <= {{}}"), vec![SqlValue::Date(to)]);
    }
}

fn compile_age_range(criteria: &SearchCriteria, roles: &ColumnRoles, qb: &mut QueryBuilder) {
    let Some(created) = &roles.created else {
        return;
    };
    if criteria.age_years_from.is_none() && criteria.age_years_to.is_none() {
        return;
    }

    // Swap inverted bounds so min <= max always holds in the emitted SQL.
    let (min_age, max_age) = match (criteria.age_years_from, criteria.age_years_to) {
        (Some(from), Some(to)) if from > to => (Some(to), Some(from)),
        other => other,
    };

    let col = quote_ident(created);
    if let Some(min) = min_age {
        // At least `min` years old: created on or before now minus min years.
        qb.push(
            &format!("{col} <= CURRENT_DATE - make_interval(years => {{}}::int)"),
            vec![SqlValue::Int(min)],
        );
    }
    if let Some(max) = max_age {
        qb.push(
            &format!("{col} >= CURRENT_DATE - make_interval(years => {{}}::int)"),
            vec![SqlValue::Int(max)],
        );
    }
}

fn compile_expires_range(criteria: &SearchCriteria, roles: &ColumnRoles, qb: &mut QueryBuilder) {
    let Some(expires) = &roles.expires else {
        return;
    };
    let col = quote_ident(expires);

    if let Some(from) = criteria.expires_from {
        qb.push(&format!("{col} >= {{}}"), vec![SqlValue::Date(from)]);
    }
    if let Some(to) = criteria.expires_to {
        qb.push(&format!("{col} <= {{}}"), vec![SqlValue::Date(to)]);
    }
}

/// Free-text contains filters apply only when the identically named column
/// exists verbatim in the catalog. No role heuristics for these.
fn compile_contains_filters(
    criteria: &SearchCriteria,
    metadata: &TableMetadata,
    qb: &mut QueryBuilder,
) {
    let filters = [
        (&criteria.country, "country"),
        (&criteria.registrar, "registrar"),
        (&criteria.technology, "technology"),
        (&criteria.response_status, "response_status"),
    ];

    for (value, column_name) in filters {
        let Some(value) = non_empty(value) else {
            continue;
        };
        let Some(column) = metadata.column(column_name) else {
            continue;
        };
        qb.push(
            &format!("{} ILIKE {{}}", quote_ident(&column.name)),
            vec![SqlValue::Text(format!("%{value}%"))],
        );
    }
}

fn compile_detected_hosts(
    criteria: &SearchCriteria,
    metadata: &TableMetadata,
    qb: &mut QueryBuilder,
) {
    let Some(column) = metadata.column("detected_hosts") else {
        return;
    };
    let col = quote_ident(&column.name);

    // Numeric columns compare directly. Anything else goes through a safe
    // cast: empty text becomes NULL and never matches, other non-numeric
    // text is left to the database's cast semantics.
    let expr = if metadata.is_numeric(&column.name) {
        col
    } else {
        format!("NULLIF({col}::text, '')::numeric")
    };

    if let Some(min) = criteria.detected_hosts_min {
        qb.push(&format!("{expr} >= {{}}"), vec![SqlValue::Int(min)]);
    }
    if let Some(max) = criteria.detected_hosts_max {
        qb.push(&format!("{expr} <= {{}}"), vec![SqlValue::Int(max)]);
    }
}

fn compile_safety_filters(
    criteria: &SearchCriteria,
    roles: &ColumnRoles,
    metadata: &TableMetadata,
    qb: &mut QueryBuilder,
) {
    if criteria.safe_spamhaus_only {
        let subset = roles.reputation_counters.iter().filter(|c| {
            let name = c.to_lowercase();
            name.contains("spamhaus") || name.contains("abuse") || name.contains("blacklist")
        });
        if let Some(fragment) = zero_counter_fragment(subset, metadata) {
            qb.push_fragment(fragment);
        }
    }

    if criteria.safe_views_total_only {
        let subset = roles
            .reputation_counters
            .iter()
            .filter(|c| c.to_lowercase().contains("views_total"));
        if let Some(fragment) = zero_counter_fragment(subset, metadata) {
            qb.push_fragment(fragment);
        }
    }
}

/// Require every counter column in the subset to be unset or non-positive.
fn zero_counter_fragment<'a>(
    columns: impl Iterator<Item = &'a String>,
    metadata: &TableMetadata,
) -> Option<String> {
    let parts: Vec<String> = columns
        .map(|c| {
            let col = quote_ident(c);
            if metadata.is_boolean(c) {
                format!("{col} IS NOT TRUE")
            } else if metadata.is_numeric(c) {
                format!("COALESCE({col}, 0) <= 0")
            } else {
                format!("COALESCE(NULLIF({col}::text, ''), '0')::numeric <= 0")
            }
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
