//! Postgres-backed versioned store.
//!
//! The compare-and-swap is a single conditional `UPDATE`:
//!
//! ```sql
//! UPDATE inventory_items
//!    SET quantity = $3, version = version + 1, updated_at = GREATEST($4, updated_at)
//!  WHERE sku = $1 AND version = $2
//! ```
//!
//! Postgres row locking makes at most one of several concurrent updates at the
//! same version match. When no row matches, a follow-up read tells a missing
//! SKU apart from a version mismatch.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `DuplicateSku` (insert only) |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / other | N/A | `Backend` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::instrument;

use stockroom_core::{Sku, WarehouseId};
use stockroom_inventory::{Item, NewItem};

use super::r#trait::{CasOutcome, StoreError, VersionedStore};

const ITEM_COLUMNS: &str =
    "sku, product_name, quantity, warehouse_id, version, created_at, updated_at";

/// Versioned store persisted in the `inventory_items` table.
///
/// The trait is synchronous; every call blocks on the runtime handle captured
/// at construction. Call it from blocking contexts only (`spawn_blocking`,
/// plain worker threads), never directly from an async task.
#[derive(Debug, Clone)]
pub struct PostgresVersionedStore {
    pool: Arc<PgPool>,
    runtime: Handle,
}

impl PostgresVersionedStore {
    /// Create a store bound to the current tokio runtime.
    pub fn new(pool: PgPool) -> Result<Self, StoreError> {
        let runtime = Handle::try_current().map_err(|_| {
            StoreError::Backend(
                "PostgresVersionedStore must be created inside a tokio runtime".to_string(),
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

    /// Create the `inventory_items` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inventory_items (
                seq           BIGSERIAL,
                sku           VARCHAR(50) PRIMARY KEY,
                product_name  VARCHAR(255) NOT NULL,
                quantity      BIGINT NOT NULL CHECK (quantity >= 0),
                warehouse_id  VARCHAR(20) NOT NULL,
                version       BIGINT NOT NULL DEFAULT 0,
                created_at    TIMESTAMPTZ NOT NULL,
                updated_at    TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_inventory_items", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_items_warehouse ON inventory_items (warehouse_id, seq)",
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_idx_items_warehouse", e))?;

        Ok(())
    }

    #[instrument(skip(self, sku), fields(sku = %sku), err)]
    pub async fn fetch(&self, sku: &Sku) -> Result<Option<Item>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE sku = $1");
        let row = sqlx::query(&sql)
            .bind(sku.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch_item", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    #[instrument(skip(self, sku), fields(sku = %sku), err)]
    pub async fn swap(
        &self,
        sku: &Sku,
        expected_version: u64,
        new_quantity: i64,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError> {
        if new_quantity < 0 {
            return Err(StoreError::InvalidQuantity {
                sku: sku.clone(),
                quantity: new_quantity,
            });
        }

        let sql = format!(
            r#"
            UPDATE inventory_items
               SET quantity = $3,
                   version = version + 1,
                   updated_at = GREATEST($4, updated_at)
             WHERE sku = $1 AND version = $2
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(sku.as_str())
            .bind(to_db_version(expected_version)?)
            .bind(new_quantity)
            .bind(at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("compare_and_swap", e))?;

        if let Some(row) = row {
            return Ok(CasOutcome::Committed(item_from_row(&row)?));
        }

        match self.fetch(sku).await? {
            Some(current) => Ok(CasOutcome::VersionMismatch {
                expected: expected_version,
                actual: current.version,
            }),
            None => Err(StoreError::NotFound(sku.clone())),
        }
    }

    #[instrument(skip(self, item), fields(sku = %item.sku), err)]
    pub async fn create(&self, item: NewItem, at: DateTime<Utc>) -> Result<Item, StoreError> {
        let item = item.into_item(at);
        let sql = format!(
            r#"
            INSERT INTO inventory_items ({ITEM_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ITEM_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(item.sku.as_str())
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.warehouse_id.as_str())
            .bind(to_db_version(item.version)?)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateSku(item.sku.clone())
                } else {
                    map_sqlx_error("insert_item", e)
                }
            })?;

        item_from_row(&row)
    }

    pub async fn fetch_all(&self, warehouse_id: Option<&WarehouseId>) -> Result<Vec<Item>, StoreError> {
        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM inventory_items
             WHERE ($1::text IS NULL OR warehouse_id = $1)
             ORDER BY seq ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(warehouse_id.map(|w| w.as_str()))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;

        rows.iter().map(item_from_row).collect()
    }

    pub async fn row_count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM inventory_items")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_items", e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| StoreError::Backend(format!("failed to read total: {e}")))?;
        Ok(usize::try_from(total).unwrap_or(0))
    }
}

impl VersionedStore for PostgresVersionedStore {
    fn get(&self, sku: &Sku) -> Result<Option<Item>, StoreError> {
        self.runtime.block_on(self.fetch(sku))
    }

    fn compare_and_swap(
        &self,
        sku: &Sku,
        expected_version: u64,
        new_quantity: i64,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError> {
        self.runtime
            .block_on(self.swap(sku, expected_version, new_quantity, at))
    }

    fn insert(&self, item: NewItem, at: DateTime<Utc>) -> Result<Item, StoreError> {
        self.runtime.block_on(self.create(item, at))
    }

    fn list(&self) -> Result<Vec<Item>, StoreError> {
        self.runtime.block_on(self.fetch_all(None))
    }

    fn list_by_warehouse(&self, warehouse_id: &WarehouseId) -> Result<Vec<Item>, StoreError> {
        self.runtime.block_on(self.fetch_all(Some(warehouse_id)))
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.runtime.block_on(self.row_count())
    }
}

fn to_db_version(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Backend(format!("version {version} out of range")))
}

fn item_from_row(row: &PgRow) -> Result<Item, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Backend(format!("failed to decode item row: {e}"));
    let invalid = |e: stockroom_core::DomainError| StoreError::Backend(format!("invalid item row: {e}"));

    let sku: String = row.try_get("sku").map_err(decode)?;
    let warehouse_id: String = row.try_get("warehouse_id").map_err(decode)?;
    let version: i64 = row.try_get("version").map_err(decode)?;

    Ok(Item {
        sku: Sku::new(sku).map_err(invalid)?,
        product_name: row.try_get("product_name").map_err(decode)?,
        quantity: row.try_get("quantity").map_err(decode)?,
        warehouse_id: WarehouseId::new(warehouse_id).map_err(invalid)?,
        version: u64::try_from(version)
            .map_err(|_| StoreError::Backend(format!("negative version {version} in row")))?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Backend(format!("sqlx error in {}: {}", operation, other)),
    }
}
