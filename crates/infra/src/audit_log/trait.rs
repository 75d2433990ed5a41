use chrono::{DateTime, Utc};
use thiserror::Error;

use stockroom_core::{Sku, WarehouseId};
use stockroom_inventory::{LogEntry, NewLogEntry};
use std::sync::Arc;

use super::window::TimeWindow;

/// Default page size of `recent`.
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Upper bound applied to any `recent` limit.
pub const MAX_RECENT_LIMIT: usize = 1000;

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("invalid time window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("audit log lock poisoned")]
    Poisoned,

    #[error("audit log backend error: {0}")]
    Backend(String),
}

/// Append-only sequence of mutation records.
///
/// ## Ordering
///
/// Entries are ordered by `(timestamp, item_version, id)`. For one SKU this is
/// the commit order, because the engine stamps entries with the commit
/// timestamp and version. Across SKUs no order beyond the timestamp is implied.
///
/// ## Implementation Requirements
///
/// - `append` assigns a fresh, increasing sequence id and never rewrites entries
/// - appends are safe from many threads at once
/// - `query` bounds are inclusive on both ends
pub trait AuditLog: Send + Sync {
    fn append(&self, entry: NewLogEntry) -> Result<LogEntry, AuditLogError>;

    /// The newest `limit` entries, newest first. `limit` is capped at [`MAX_RECENT_LIMIT`].
    fn recent(&self, limit: usize) -> Result<Vec<LogEntry>, AuditLogError>;

    /// Entries of one warehouse whose timestamp lies within `window`, oldest first.
    fn query(
        &self,
        warehouse_id: &WarehouseId,
        window: TimeWindow,
    ) -> Result<Vec<LogEntry>, AuditLogError>;

    /// All entries of one SKU in commit order.
    fn for_sku(&self, sku: &Sku) -> Result<Vec<LogEntry>, AuditLogError>;

    fn len(&self) -> Result<usize, AuditLogError>;

    fn is_empty(&self) -> Result<bool, AuditLogError> {
        Ok(self.len()? == 0)
    }
}

impl<L> AuditLog for Arc<L>
where
    L: AuditLog + ?Sized,
{
    fn append(&self, entry: NewLogEntry) -> Result<LogEntry, AuditLogError> {
        (**self).append(entry)
    }

    fn recent(&self, limit: usize) -> Result<Vec<LogEntry>, AuditLogError> {
        (**self).recent(limit)
    }

    fn query(
        &self,
        warehouse_id: &WarehouseId,
        window: TimeWindow,
    ) -> Result<Vec<LogEntry>, AuditLogError> {
        (**self).query(warehouse_id, window)
    }

    fn for_sku(&self, sku: &Sku) -> Result<Vec<LogEntry>, AuditLogError> {
        (**self).for_sku(sku)
    }

    fn len(&self) -> Result<usize, AuditLogError> {
        (**self).len()
    }
}
