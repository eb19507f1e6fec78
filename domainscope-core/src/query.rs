//! SQL Fragment Builder
//!
//! Accumulates WHERE-clause fragments with positional `$N` placeholders and
//! the bound values they reference. Values are never interpolated into SQL
//! text; dynamic identifiers always pass through [`quote_ident`]. This is a
//! security invariant, not a style choice.

use chrono::NaiveDate;
use serde::Serialize;

/// A value bound to a positional SQL parameter.
///
/// The api crate converts these to `tokio_postgres` parameters at execution
/// time; core stays free of database dependencies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

/// Quote a SQL identifier: wrap in double quotes, doubling any internal ones.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Builder for an AND-combined WHERE clause.
///
/// Fragment order is preserved for determinism but does not affect the
/// result (all fragments are AND-combined).
#[derive(Debug, Default)]
pub struct QueryBuilder {
    fragments: Vec<String>,
    params: Vec<SqlValue>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value and return its `$N` placeholder.
    ///
    /// Callers compose fragments from the returned placeholders and push the
    /// finished fragment with [`push_fragment`](Self::push_fragment), so bind
    /// order always matches placeholder order.
    pub fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    /// Push a completed boolean fragment.
    pub fn push_fragment(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    /// Push a fragment template, rewriting each `{}` marker into the next
    /// positional placeholder for the given values.
    pub fn push(&mut self, template: &str, values: Vec<SqlValue>) {
        let mut fragment = String::with_capacity(template.len());
        let mut parts = template.split("{}");
        if let Some(first) = parts.next() {
            fragment.push_str(first);
        }
        for (part, value) in parts.zip(values) {
            let placeholder = self.bind(value);
            fragment.push_str(&placeholder);
            fragment.push_str(part);
        }
        self.push_fragment(fragment);
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The WHERE clause for the accumulated fragments, with a leading space,
    /// or an empty string when no fragment was pushed.
    pub fn where_clause(&self) -> String {
        if self.fragments.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.fragments.join(" AND "))
        }
    }
}
