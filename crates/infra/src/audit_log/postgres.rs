//! Postgres-backed audit log (`inventory_logs` table).
//!
//! Rows are only ever inserted. Warehouse range queries are served by the
//! composite index `idx_warehouse_timestamp (warehouse_id, timestamp)`.

use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::instrument;

use stockroom_core::{LogEntryId, Sku, WarehouseId};
use stockroom_inventory::{LogEntry, NewLogEntry, StockAction};

use super::r#trait::{AuditLog, AuditLogError, MAX_RECENT_LIMIT};
use super::window::TimeWindow;

const LOG_COLUMNS: &str = "id, warehouse_id, sku, action, quantity_change, resulting_quantity, \
                           item_version, timestamp, details";

/// Audit log persisted in Postgres.
///
/// Like [`crate::store::PostgresVersionedStore`], trait calls block on the
/// runtime handle captured at construction.
#[derive(Debug, Clone)]
pub struct PostgresAuditLog {
    pool: Arc<PgPool>,
    runtime: Handle,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Result<Self, AuditLogError> {
        let runtime = Handle::try_current().map_err(|_| {
            AuditLogError::Backend(
                "PostgresAuditLog must be created inside a tokio runtime".to_string(),
            )
        })?;
        Ok(Self::with_runtime(pool, runtime))
    }

    pub fn with_runtime(pool: PgPool, runtime: Handle) -> Self {
        Self {
            pool: Arc::new(pool),
            runtime,
        }
    }

    /// Create the `inventory_logs` table and its indexes if missing.
    pub async fn ensure_schema(&self) -> Result<(), AuditLogError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS inventory_logs (
                id                  BIGSERIAL PRIMARY KEY,
                warehouse_id        VARCHAR(20) NOT NULL,
                sku                 VARCHAR(50) NOT NULL,
                action              VARCHAR(16) NOT NULL,
                quantity_change     BIGINT NOT NULL,
                resulting_quantity  BIGINT NOT NULL,
                item_version        BIGINT NOT NULL,
                timestamp           TIMESTAMPTZ NOT NULL,
                details             TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_warehouse_timestamp ON inventory_logs (warehouse_id, timestamp)",
            "CREATE INDEX IF NOT EXISTS idx_logs_sku_version ON inventory_logs (sku, item_version)",
        ];

        for sql in statements {
            sqlx::query(sql)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    #[instrument(skip(self, entry), fields(sku = %entry.sku, version = entry.item_version), err)]
    pub async fn insert(&self, entry: NewLogEntry) -> Result<LogEntry, AuditLogError> {
        let version = i64::try_from(entry.item_version)
            .map_err(|_| AuditLogError::Backend("item_version out of range".to_string()))?;

        let row = sqlx::query(
            r#"
            INSERT INTO inventory_logs
                (warehouse_id, sku, action, quantity_change, resulting_quantity, item_version, timestamp, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(entry.warehouse_id.as_str())
        .bind(entry.sku.as_str())
        .bind(entry.action.as_str())
        .bind(entry.quantity_change)
        .bind(entry.resulting_quantity)
        .bind(version)
        .bind(entry.timestamp)
        .bind(entry.details.as_deref())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_log", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| AuditLogError::Backend(format!("failed to read id: {e}")))?;
        Ok(entry.into_entry(LogEntryId::new(id as u64)))
    }

    pub async fn fetch_recent(&self, limit: usize) -> Result<Vec<LogEntry>, AuditLogError> {
        let limit = limit.min(MAX_RECENT_LIMIT) as i64;
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM inventory_logs \
             ORDER BY timestamp DESC, item_version DESC, id DESC LIMIT $1"
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("recent_logs", e))?;

        rows.iter().map(entry_from_row).collect()
    }

    #[instrument(skip(self, warehouse_id), fields(warehouse_id = %warehouse_id), err)]
    pub async fn fetch_range(
        &self,
        warehouse_id: &WarehouseId,
        window: TimeWindow,
    ) -> Result<Vec<LogEntry>, AuditLogError> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM inventory_logs \
             WHERE warehouse_id = $1 AND timestamp >= $2 AND timestamp <= $3 \
             ORDER BY timestamp ASC, item_version ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(warehouse_id.as_str())
            .bind(window.start())
            .bind(window.end())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_logs", e))?;

        rows.iter().map(entry_from_row).collect()
    }

    pub async fn fetch_for_sku(&self, sku: &Sku) -> Result<Vec<LogEntry>, AuditLogError> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM inventory_logs WHERE sku = $1 ORDER BY item_version ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(sku.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("logs_for_sku", e))?;

        rows.iter().map(entry_from_row).collect()
    }

    pub async fn row_count(&self) -> Result<usize, AuditLogError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM inventory_logs")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_logs", e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| AuditLogError::Backend(format!("failed to read total: {e}")))?;
        Ok(usize::try_from(total).unwrap_or(0))
    }
}

impl AuditLog for PostgresAuditLog {
    fn append(&self, entry: NewLogEntry) -> Result<LogEntry, AuditLogError> {
        self.runtime.block_on(self.insert(entry))
    }

    fn recent(&self, limit: usize) -> Result<Vec<LogEntry>, AuditLogError> {
        self.runtime.block_on(self.fetch_recent(limit))
    }

    fn query(
        &self,
        warehouse_id: &WarehouseId,
        window: TimeWindow,
    ) -> Result<Vec<LogEntry>, AuditLogError> {
        self.runtime.block_on(self.fetch_range(warehouse_id, window))
    }

    fn for_sku(&self, sku: &Sku) -> Result<Vec<LogEntry>, AuditLogError> {
        self.runtime.block_on(self.fetch_for_sku(sku))
    }

    fn len(&self) -> Result<usize, AuditLogError> {
        self.runtime.block_on(self.row_count())
    }
}

fn entry_from_row(row: &PgRow) -> Result<LogEntry, AuditLogError> {
    let decode = |e: sqlx::Error| AuditLogError::Backend(format!("failed to decode log row: {e}"));
    let invalid =
        |e: stockroom_core::DomainError| AuditLogError::Backend(format!("invalid log row: {e}"));

    let id: i64 = row.try_get("id").map_err(decode)?;
    let warehouse_id: String = row.try_get("warehouse_id").map_err(decode)?;
    let sku: String = row.try_get("sku").map_err(decode)?;
    let action: String = row.try_get("action").map_err(decode)?;
    let item_version: i64 = row.try_get("item_version").map_err(decode)?;

    Ok(LogEntry {
        id: LogEntryId::new(id as u64),
        warehouse_id: WarehouseId::new(warehouse_id).map_err(invalid)?,
        sku: Sku::new(sku).map_err(invalid)?,
        action: action.parse::<StockAction>().map_err(invalid)?,
        quantity_change: row.try_get("quantity_change").map_err(decode)?,
        resulting_quantity: row.try_get("resulting_quantity").map_err(decode)?,
        item_version: item_version as u64,
        timestamp: row.try_get("timestamp").map_err(decode)?,
        details: row.try_get("details").map_err(decode)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> AuditLogError {
    match err {
        sqlx::Error::Database(db_err) => {
            AuditLogError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            AuditLogError::Backend(format!("connection pool closed in {}", operation))
        }
        other => AuditLogError::Backend(format!("sqlx error in {}: {}", operation, other)),
    }
}
