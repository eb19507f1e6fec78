//! Database Connection Pool and Query Executor
//!
//! PostgreSQL connection pooling via deadpool-postgres, runtime catalog
//! introspection of the configured target table, and the paginated search
//! executor. The target table's shape is unknown at compile time: every
//! query is assembled from quoted identifiers and positional parameters
//! produced by the domainscope-core compiler.

use std::sync::Arc;
use std::time::Duration;

use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use serde::Serialize;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;

use domainscope_core::{
    compile_criteria, quote_ident, ColumnRoles, QueryBuilder, SearchCriteria, SqlValue,
    TableColumn, TableMetadata,
};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// PAGINATION BOUNDS
// ============================================================================

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Clamp a client-supplied page number to >= 1.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Clamp a client-supplied page size to 1..=500, defaulting to 50.
pub fn clamp_page_size(page_size: Option<i64>) -> i64 {
    page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
    /// Schema of the target table
    pub schema: String,
    /// Name of the target table
    pub table: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "domainscope".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
            schema: "public".to_string(),
            table: "domains".to_string(),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("DOMAINSCOPE_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("DOMAINSCOPE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("DOMAINSCOPE_DB_NAME")
                .unwrap_or_else(|_| "domainscope".to_string()),
            user: std::env::var("DOMAINSCOPE_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("DOMAINSCOPE_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("DOMAINSCOPE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("DOMAINSCOPE_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            schema: std::env::var("DOMAINSCOPE_DB_SCHEMA")
                .unwrap_or_else(|_| "public".to_string()),
            table: std::env::var("DOMAINSCOPE_DB_TABLE")
                .unwrap_or_else(|_| "domains".to_string()),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        // Bounded pool: max_size caps in-flight queries; the wait timeout
        // keeps callers from queueing forever when the pool is saturated.
        let mut pool_config = PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT
// ============================================================================

/// Database client wrapping the connection pool and the target table name.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
    schema: String,
    table: String,
}

impl DbClient {
    /// Create a new database client with the given pool and target table.
    pub fn new(pool: Pool, schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool, config.schema.clone(), config.table.clone()))
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        let status = self.pool.status();
        status.size
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> ApiResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// Liveness probe: round-trip a trivial query.
    pub async fn ping(&self) -> ApiResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await?;
        Ok(())
    }

    /// Introspect the target table's columns from the catalog, in ordinal
    /// position order.
    pub async fn load_table_metadata(&self) -> ApiResult<TableMetadata> {
        let conn = self.get_conn().await?;

        let rows = conn
            .query(
                "SELECT column_name::text, data_type::text, udt_name::text \
                 FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 \
                 ORDER BY ordinal_position",
                &[&self.schema, &self.table],
            )
            .await?;

        let columns = rows
            .iter()
            .map(|row| TableColumn {
                name: row.get(0),
                data_type: row.get(1),
                udt_name: row.get(2),
            })
            .collect();

        Ok(TableMetadata {
            schema_name: self.schema.clone(),
            table_name: self.table.clone(),
            columns,
        })
    }

    // ========================================================================
    // SEARCH EXECUTOR
    // ========================================================================

    /// Run a paginated search: COUNT with the compiled WHERE clause, then a
    /// projected SELECT ordered by the domain column.
    pub async fn search(
        &self,
        metadata: &TableMetadata,
        roles: &ColumnRoles,
        criteria: &SearchCriteria,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> ApiResult<SearchPage> {
        let page = clamp_page(page);
        let page_size = clamp_page_size(page_size);

        let mut qb = QueryBuilder::new();
        compile_criteria(criteria, roles, metadata, &mut qb);

        let table = format!(
            "{}.{}",
            quote_ident(&metadata.schema_name),
            quote_ident(&metadata.table_name)
        );
        let where_clause = qb.where_clause();
        let params = to_sql_params(qb.params());

        let conn = self.get_conn().await?;

        let count_sql = format!("SELECT COUNT(*) FROM {table}{where_clause}");
        let total: i64 = conn.query_one(&count_sql, &params).await?.get(0);

        let projection = build_projection(metadata, roles);
        let items = if projection.is_empty() || total == 0 {
            // Either nothing to show for this catalog or nothing matched.
            Vec::new()
        } else {
            let select_list = projection
                .iter()
                .map(|(expr, alias)| format!("{} AS {}", expr, quote_ident(alias)))
                .collect::<Vec<_>>()
                .join(", ");
            let order_clause = roles
                .domain
                .as_ref()
                .map(|d| format!(" ORDER BY {} ASC", quote_ident(d)))
                .unwrap_or_default();
            let offset = (page - 1).saturating_mul(page_size);
            let select_sql = format!(
                "SELECT {select_list} FROM {table}{where_clause}{order_clause} \
                 LIMIT {page_size} OFFSET {offset}"
            );

            let rows = conn.query(&select_sql, &params).await?;
            rows.iter()
                .map(|row| {
                    let mut item = serde_json::Map::new();
                    for (idx, (_, alias)) in projection.iter().enumerate() {
                        let value: Option<String> = row.get(idx);
                        item.insert(
                            alias.clone(),
                            value.map(serde_json::Value::String).unwrap_or(serde_json::Value::Null),
                        );
                    }
                    serde_json::Value::Object(item)
                })
                .collect()
        };

        Ok(SearchPage {
            page,
            page_size,
            total,
            total_pages: total_pages(total, page_size),
            items,
        })
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
    pub items: Vec<serde_json::Value>,
}

fn total_pages(total: i64, page_size: i64) -> i64 {
    ((total + page_size - 1) / page_size).max(1)
}

/// The projected (expression, alias) list: the domain column under its
/// canonical alias, every resolved role column under its canonical alias,
/// and the literal fixed-name columns that exist verbatim. Everything is
/// rendered as text so unknown column types stay representable.
fn build_projection(metadata: &TableMetadata, roles: &ColumnRoles) -> Vec<(String, String)> {
    let mut projection = Vec::new();

    let mut push_role = |column: &Option<String>, alias: &str| {
        if let Some(column) = column {
            projection.push((format!("{}::text", quote_ident(column)), alias.to_string()));
        }
    };

    push_role(&roles.domain, "domain");
    push_role(&roles.tld, "tld");
    push_role(&roles.created, "createdAt");
    push_role(&roles.expires, "expiresAt");
    push_role(&roles.scheduled_delete, "deleteDate");
    push_role(&roles.deleted_at, "deletedAt");
    push_role(&roles.deleted_flag, "isDeleted");
    push_role(&roles.status, "status");

    for name in [
        "country",
        "registrar",
        "technology",
        "response_status",
        "detected_hosts",
    ] {
        if let Some(column) = metadata.column(name) {
            // Skip columns already projected under a role alias.
            if projection.iter().any(|(expr, _)| {
                expr == &format!("{}::text", quote_ident(&column.name))
            }) {
                continue;
            }
            projection.push((
                format!("{}::text", quote_ident(&column.name)),
                name.to_string(),
            ));
        }
    }

    projection
}

/// Convert compiled parameter values into tokio-postgres bind parameters.
fn to_sql_params(values: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    values
        .iter()
        .map(|value| match value {
            SqlValue::Text(v) => v as &(dyn ToSql + Sync),
            SqlValue::Int(v) => v as &(dyn ToSql + Sync),
            SqlValue::Float(v) => v as &(dyn ToSql + Sync),
            SqlValue::Bool(v) => v as &(dyn ToSql + Sync),
            SqlValue::Date(v) => v as &(dyn ToSql + Sync),
        })
        .collect()
}

// ============================================================================
// SCHEMA METADATA CACHE
// ============================================================================

/// Source of table metadata, behind a seam so the cache can be exercised
/// without a live database.
#[async_trait::async_trait]
pub trait MetadataLoader: Send + Sync {
    /// Run the catalog query.
    async fn load(&self) -> ApiResult<TableMetadata>;

    /// The degraded value used when the catalog query fails.
    fn fallback(&self) -> TableMetadata;
}

#[async_trait::async_trait]
impl MetadataLoader for DbClient {
    async fn load(&self) -> ApiResult<TableMetadata> {
        self.load_table_metadata().await
    }

    fn fallback(&self) -> TableMetadata {
        TableMetadata::empty(self.schema(), self.table())
    }
}

/// Process-lifetime cache for the introspected table metadata.
///
/// Single-flight: concurrent first calls trigger exactly one catalog query
/// (tokio's OnceCell guarantees one initializer run). A catalog failure
/// degrades to empty metadata with a warning instead of failing the caller;
/// all role resolution then finds nothing and every schema-dependent filter
/// becomes a no-op.
#[derive(Clone)]
pub struct MetadataCache {
    loader: Arc<dyn MetadataLoader>,
    cell: Arc<tokio::sync::OnceCell<TableMetadata>>,
}

impl MetadataCache {
    pub fn new(loader: Arc<dyn MetadataLoader>) -> Self {
        Self {
            loader,
            cell: Arc::new(tokio::sync::OnceCell::new()),
        }
    }

    /// Get the table metadata, loading it on first use.
    pub async fn get(&self) -> TableMetadata {
        self.cell
            .get_or_init(|| async {
                match self.loader.load().await {
                    Ok(metadata) => {
                        tracing::info!(
                            schema = %metadata.schema_name,
                            table = %metadata.table_name,
                            columns = metadata.columns.len(),
                            "Loaded table metadata"
                        );
                        metadata
                    }
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            "Failed to load table metadata, degrading to empty catalog"
                        );
                        self.loader.fallback()
                    }
                }
            })
            .await
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domainscope_core::TableColumn;

    fn text_col(name: &str) -> TableColumn {
        TableColumn {
            name: name.to_string(),
            data_type: "text".to_string(),
            udt_name: "text".to_string(),
        }
    }

    #[test]
    fn test_page_clamping() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(0)), 1);
        assert_eq!(clamp_page(Some(-3)), 1);
        assert_eq!(clamp_page(Some(7)), 7);
    }

    #[test]
    fn test_page_size_clamping() {
        assert_eq!(clamp_page_size(None), 50);
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(Some(10_000)), 500);
        assert_eq!(clamp_page_size(Some(25)), 25);
    }

    #[test]
    fn test_pool_respects_configured_size_and_wait_timeout() {
        // Pool creation is lazy: no connection is attempted here.
        let config = DbConfig {
            max_size: 7,
            timeout: Duration::from_secs(3),
            ..Default::default()
        };
        let pool = config.create_pool().unwrap();

        assert_eq!(pool.status().max_size, 7);
        assert_eq!(pool.timeouts().wait, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_total_pages_arithmetic() {
        assert_eq!(total_pages(0, 50), 1);
        assert_eq!(total_pages(1, 50), 1);
        assert_eq!(total_pages(50, 50), 1);
        assert_eq!(total_pages(51, 50), 2);
        assert_eq!(total_pages(1000, 500), 2);
    }

    #[test]
    fn test_projection_aliases_roles_canonically() {
        let metadata = TableMetadata {
            schema_name: "public".to_string(),
            table_name: "domains".to_string(),
            columns: vec![
                text_col("fqdn"),
                text_col("creation_date"),
                text_col("country"),
            ],
        };
        let roles = ColumnRoles::resolve(&metadata);

        let projection = build_projection(&metadata, &roles);
        assert_eq!(
            projection,
            vec![
                ("\"fqdn\"::text".to_string(), "domain".to_string()),
                ("\"creation_date\"::text".to_string(), "createdAt".to_string()),
                ("\"country\"::text".to_string(), "country".to_string()),
            ]
        );
    }

    #[test]
    fn test_projection_skips_duplicate_role_columns() {
        // "response_status" resolves as the status role; it must not be
        // projected a second time under its literal name.
        let metadata = TableMetadata {
            schema_name: "public".to_string(),
            table_name: "domains".to_string(),
            columns: vec![text_col("domain"), text_col("response_status")],
        };
        let roles = ColumnRoles::resolve(&metadata);
        assert_eq!(roles.status.as_deref(), Some("response_status"));

        let projection = build_projection(&metadata, &roles);
        let exprs: Vec<&String> = projection.iter().map(|(expr, _)| expr).collect();
        let dupes = exprs
            .iter()
            .filter(|e| e.contains("response_status"))
            .count();
        assert_eq!(dupes, 1);
    }

    #[test]
    fn test_projection_empty_for_empty_catalog() {
        let metadata = TableMetadata::empty("public", "domains");
        let roles = ColumnRoles::resolve(&metadata);
        assert!(build_projection(&metadata, &roles).is_empty());
    }

    // ========================================================================
    // METADATA CACHE
    // ========================================================================

    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl MetadataLoader for CountingLoader {
        async fn load(&self) -> ApiResult<TableMetadata> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ApiError::database_error("catalog unavailable"))
            } else {
                Ok(TableMetadata {
                    schema_name: "public".to_string(),
                    table_name: "domains".to_string(),
                    columns: vec![text_col("domain")],
                })
            }
        }

        fn fallback(&self) -> TableMetadata {
            TableMetadata::empty("public", "domains")
        }
    }

    #[tokio::test]
    async fn test_metadata_cache_issues_catalog_query_once() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cache = MetadataCache::new(loader.clone());

        // Concurrent first calls plus repeated later calls: one load total.
        let (a, b) = tokio::join!(cache.get(), cache.get());
        let c = cache.get().await;

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_metadata_cache_degrades_to_empty_catalog() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cache = MetadataCache::new(loader.clone());

        let metadata = cache.get().await;
        assert!(metadata.columns.is_empty());

        // The failure is cached too: no retry storm against the catalog.
        cache.get().await;
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }
}
