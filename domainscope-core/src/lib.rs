//! DOMAINSCOPE Core - Schema Model and Filter Compiler
//!
//! Pure types and pure functions with no IO. This crate models an unknown
//! relational table (introspected at runtime), resolves semantic column roles
//! against it, and compiles a structured filter specification into
//! parameterized SQL fragments. The api crate owns all database and network
//! access.

pub mod compile;
pub mod criteria;
pub mod domain;
pub mod error;
pub mod query;
pub mod roles;
pub mod schema;

// Re-export commonly used types
pub use compile::compile_criteria;
pub use criteria::{LifecycleState, SearchCriteria};
pub use domain::normalize_domain;
pub use error::CoreError;
pub use query::{quote_ident, QueryBuilder, SqlValue};
pub use roles::ColumnRoles;
pub use schema::{TableColumn, TableMetadata};
