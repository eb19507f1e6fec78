//! Table Metadata Model
//!
//! Value objects describing the introspected catalog of the target table.
//! Loaded once per process by the api crate and treated as immutable from
//! then on. Column order is the catalog ordinal position, which makes role
//! resolution deterministic.

use serde::{Deserialize, Serialize};

/// A single column from the catalog view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Physical column name as reported by the catalog.
    pub name: String,
    /// SQL standard data type (e.g. "character varying", "timestamp with time zone").
    pub data_type: String,
    /// Postgres underlying type name (e.g. "varchar", "timestamptz", "bool").
    pub udt_name: String,
}

/// The introspected shape of the target table.
///
/// An empty `columns` list is a valid degraded state: every role resolution
/// then fails softly and every schema-dependent filter becomes a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub schema_name: String,
    pub table_name: String,
    /// Columns in catalog ordinal position order.
    pub columns: Vec<TableColumn>,
}

impl TableMetadata {
    /// Create metadata with no columns (catalog query failed or table absent).
    pub fn empty(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            columns: Vec::new(),
        }
    }

    /// Look up a column by exact name, case-insensitively.
    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Whether a column with this exact name exists (case-insensitive).
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Whether the column is boolean-typed.
    pub fn is_boolean(&self, name: &str) -> bool {
        self.column(name)
            .map(|c| c.data_type.eq_ignore_ascii_case("boolean") || c.udt_name == "bool")
            .unwrap_or(false)
    }

    /// Whether the column is numeric-typed.
    pub fn is_numeric(&self, name: &str) -> bool {
        self.column(name)
            .map(|c| {
                matches!(
                    c.udt_name.as_str(),
                    "int2" | "int4" | "int8" | "numeric" | "float4" | "float8"
                ) || matches!(
                    c.data_type.to_ascii_lowercase().as_str(),
                    "smallint" | "integer" | "bigint" | "numeric" | "real" | "double precision"
                )
            })
            .unwrap_or(false)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, data_type: &str, udt: &str) -> TableColumn {
        TableColumn {
            name: name.to_string(),
            data_type: data_type.to_string(),
            udt_name: udt.to_string(),
        }
    }

    fn meta(columns: Vec<TableColumn>) -> TableMetadata {
        TableMetadata {
            schema_name: "public".to_string(),
            table_name: "domains".to_string(),
            columns,
        }
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let m = meta(vec![col("Domain", "text", "text")]);
        assert!(m.has_column("domain"));
        assert!(m.has_column("DOMAIN"));
        assert!(!m.has_column("tld"));
    }

    #[test]
    fn test_type_classification() {
        let m = meta(vec![
            col("is_deleted", "boolean", "bool"),
            col("detected_hosts", "integer", "int4"),
            col("views_total", "numeric", "numeric"),
            col("created_at", "timestamp with time zone", "timestamptz"),
            col("domain", "character varying", "varchar"),
        ]);

        assert!(m.is_boolean("is_deleted"));
        assert!(!m.is_boolean("domain"));
        assert!(m.is_numeric("detected_hosts"));
        assert!(m.is_numeric("views_total"));
        assert!(!m.is_numeric("created_at"));
        assert!(!m.is_numeric("domain"));
    }

    #[test]
    fn test_empty_metadata_degrades() {
        let m = TableMetadata::empty("public", "domains");
        assert!(m.columns.is_empty());
        assert!(!m.has_column("domain"));
        assert!(!m.is_boolean("anything"));
    }
}
