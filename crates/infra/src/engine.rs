//! Stock mutation pipeline.
//!
//! ```text
//! update_stock(sku, delta)
//!   ↓
//! 1. Read current item (NotFound if absent)
//!   ↓
//! 2. Plan new quantity (InvalidRequest if it would go negative)
//!   ↓
//! 3. Compare-and-swap against the version read in 1, exactly once (Conflict on mismatch)
//!   ↓
//! 4. Append audit entry stamped with the commit timestamp and version
//! ```
//!
//! There is no retry loop: a conflict is returned to the caller, who decides
//! whether to try again. Failed attempts leave both the store and the log
//! untouched.
//!
//! The store commit and the log append are two separate steps. If the append
//! fails after a commit, the quantity change stays applied and the caller gets
//! [`StockError::UnloggedCommit`].

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use stockroom_core::{Clock, DomainError, LogEntryId, Sku, SystemClock, WarehouseId};
use stockroom_inventory::{Item, LogEntry, NewLogEntry};

use crate::audit_log::{AuditLog, AuditLogError, DEFAULT_RECENT_LIMIT, TimeWindow};
use crate::seed;
use crate::store::{CasOutcome, StoreError, VersionedStore};

/// Detail recorded on log entries when the caller gives none.
pub const DEFAULT_DETAIL: &str = "Stock updated via API";

/// Outcome of a stock update that did not commit (or committed without a log entry).
#[derive(Debug, Error)]
pub enum StockError {
    /// Unknown SKU.
    #[error("SKU not found: {0}")]
    NotFound(Sku),

    /// The request can never succeed as-is (e.g. stock would go negative).
    #[error("{0}")]
    InvalidRequest(String),

    /// The item changed between read and commit. Retrying may succeed.
    #[error(
        "Concurrent modification detected for SKU: {0}. Another transaction updated this item. Retry the operation."
    )]
    Conflict(Sku),

    /// The quantity change committed but its audit entry could not be written.
    #[error("stock for {sku} committed at version {version} but the audit entry was not written: {source}")]
    UnloggedCommit {
        sku: Sku,
        version: u64,
        #[source]
        source: AuditLogError,
    },

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    AuditLog(AuditLogError),
}

impl StockError {
    /// Only a conflict implies that the same request may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StockError::Conflict(_))
    }

    /// The quantity change was applied even though an error is reported.
    pub fn is_committed(&self) -> bool {
        matches!(self, StockError::UnloggedCommit { .. })
    }

    /// Client-caused failures (as opposed to conflicts or backend faults).
    pub fn is_rejection(&self) -> bool {
        matches!(self, StockError::NotFound(_) | StockError::InvalidRequest(_))
    }
}

impl From<StoreError> for StockError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(sku) => StockError::NotFound(sku),
            StoreError::InvalidQuantity { sku, quantity } => StockError::InvalidRequest(format!(
                "quantity for SKU {sku} cannot become negative ({quantity})"
            )),
            other => StockError::Store(other),
        }
    }
}

impl From<AuditLogError> for StockError {
    fn from(value: AuditLogError) -> Self {
        match value {
            AuditLogError::InvalidWindow { .. } => StockError::InvalidRequest(value.to_string()),
            other => StockError::AuditLog(other),
        }
    }
}

impl From<DomainError> for StockError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => StockError::InvalidRequest(msg),
        }
    }
}

/// A committed stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockUpdate {
    pub sku: Sku,
    pub quantity: i64,
    pub version: u64,
    pub log_entry_id: LogEntryId,
}

/// Orchestrates stock changes against a [`VersionedStore`] and an [`AuditLog`].
///
/// Safe to share between threads; it holds no state of its own beyond its
/// collaborators.
pub struct MutationEngine<S, L> {
    store: S,
    log: L,
    clock: Arc<dyn Clock>,
}

impl<S, L> MutationEngine<S, L>
where
    S: VersionedStore,
    L: AuditLog,
{
    pub fn new(store: S, log: L) -> Self {
        Self::with_clock(store, log, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, log: L, clock: Arc<dyn Clock>) -> Self {
        Self { store, log, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Apply `delta` to the stock of `sku` with a single compare-and-swap.
    pub fn update_stock(&self, sku: &Sku, delta: i64) -> Result<StockUpdate, StockError> {
        self.update_stock_with_detail(sku, delta, DEFAULT_DETAIL)
    }

    #[instrument(level = "debug", skip(self, sku, detail), fields(sku = %sku))]
    pub fn update_stock_with_detail(
        &self,
        sku: &Sku,
        delta: i64,
        detail: impl Into<String>,
    ) -> Result<StockUpdate, StockError> {
        let current = self.store.get(sku)?.ok_or_else(|| {
            debug!("stock update rejected: unknown sku");
            StockError::NotFound(sku.clone())
        })?;

        let new_quantity = current.plan_adjustment(delta).map_err(|e| {
            debug!(quantity = current.quantity, delta, "stock update rejected");
            StockError::from(e)
        })?;

        let at = self.clock.now();
        let committed = match self
            .store
            .compare_and_swap(sku, current.version, new_quantity, at)?
        {
            CasOutcome::Committed(item) => item,
            CasOutcome::VersionMismatch { expected, actual } => {
                warn!(expected, actual, "optimistic lock conflict");
                return Err(StockError::Conflict(sku.clone()));
            }
        };

        let entry = NewLogEntry::for_commit(&committed, delta, Some(detail.into()));
        let entry = self.log.append(entry).map_err(|source| {
            error!(version = committed.version, error = %source, "audit append failed after commit");
            StockError::UnloggedCommit {
                sku: sku.clone(),
                version: committed.version,
                source,
            }
        })?;

        debug!(
            quantity = committed.quantity,
            version = committed.version,
            log_entry_id = %entry.id,
            "stock updated"
        );

        Ok(StockUpdate {
            sku: committed.sku,
            quantity: committed.quantity,
            version: committed.version,
            log_entry_id: entry.id,
        })
    }

    pub fn item(&self, sku: &Sku) -> Result<Item, StockError> {
        self.store
            .get(sku)?
            .ok_or_else(|| StockError::NotFound(sku.clone()))
    }

    pub fn items(&self) -> Result<Vec<Item>, StockError> {
        Ok(self.store.list()?)
    }

    pub fn items_in_warehouse(&self, warehouse_id: &WarehouseId) -> Result<Vec<Item>, StockError> {
        Ok(self.store.list_by_warehouse(warehouse_id)?)
    }

    /// Newest entries first; `None` means the default page of 50.
    pub fn recent_logs(&self, limit: Option<usize>) -> Result<Vec<LogEntry>, StockError> {
        Ok(self.log.recent(limit.unwrap_or(DEFAULT_RECENT_LIMIT))?)
    }

    /// Warehouse activity within `[start, end]`; missing bounds default to the last 30 days.
    pub fn query_logs(
        &self,
        warehouse_id: &WarehouseId,
        start: Option<chrono::DateTime<chrono::Utc>>,
        end: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<LogEntry>, StockError> {
        let window = TimeWindow::resolve(start, end, self.clock.now())?;
        Ok(self.log.query(warehouse_id, window)?)
    }

    pub fn logs_for_sku(&self, sku: &Sku) -> Result<Vec<LogEntry>, StockError> {
        Ok(self.log.for_sku(sku)?)
    }

    /// Insert the default catalog if the store holds no items. Returns how many were inserted.
    pub fn seed_if_empty(&self) -> Result<usize, StockError> {
        Ok(seed::seed_if_empty(&self.store, self.clock.as_ref())?)
    }
}
