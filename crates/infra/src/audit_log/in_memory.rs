use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use stockroom_core::{LogEntryId, Sku, WarehouseId};
use stockroom_inventory::{LogEntry, NewLogEntry};

use super::r#trait::{AuditLog, AuditLogError, MAX_RECENT_LIMIT};
use super::window::TimeWindow;

type WarehouseKey = (WarehouseId, DateTime<Utc>, u64, LogEntryId);
type TimeKey = (DateTime<Utc>, u64, LogEntryId);

#[derive(Debug, Default)]
struct LogState {
    /// Entry with id `n` lives at index `n - 1`.
    entries: Vec<LogEntry>,
    /// Composite (warehouse, timestamp) index for range scans.
    by_warehouse: BTreeMap<WarehouseKey, usize>,
    by_time: BTreeMap<TimeKey, usize>,
    by_sku: HashMap<Sku, BTreeMap<(u64, LogEntryId), usize>>,
}

/// In-memory append-only audit log.
///
/// Intended for tests/dev and the single-process deployment.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    state: RwLock<LogState>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, entry: NewLogEntry) -> Result<LogEntry, AuditLogError> {
        let mut state = self.state.write().map_err(|_| AuditLogError::Poisoned)?;

        let idx = state.entries.len();
        let id = LogEntryId::new(idx as u64 + 1);
        let stored = entry.into_entry(id);

        state.by_warehouse.insert(
            (
                stored.warehouse_id.clone(),
                stored.timestamp,
                stored.item_version,
                id,
            ),
            idx,
        );
        state.by_time.insert(stored.order_key(), idx);
        state
            .by_sku
            .entry(stored.sku.clone())
            .or_default()
            .insert((stored.item_version, id), idx);
        state.entries.push(stored.clone());

        Ok(stored)
    }

    fn recent(&self, limit: usize) -> Result<Vec<LogEntry>, AuditLogError> {
        let state = self.state.read().map_err(|_| AuditLogError::Poisoned)?;
        Ok(state
            .by_time
            .values()
            .rev()
            .take(limit.min(MAX_RECENT_LIMIT))
            .map(|&idx| state.entries[idx].clone())
            .collect())
    }

    fn query(
        &self,
        warehouse_id: &WarehouseId,
        window: TimeWindow,
    ) -> Result<Vec<LogEntry>, AuditLogError> {
        let state = self.state.read().map_err(|_| AuditLogError::Poisoned)?;
        let lower = (warehouse_id.clone(), window.start(), 0, LogEntryId::MIN);
        let upper = (warehouse_id.clone(), window.end(), u64::MAX, LogEntryId::MAX);

        Ok(state
            .by_warehouse
            .range(lower..=upper)
            .map(|(_, &idx)| state.entries[idx].clone())
            .collect())
    }

    fn for_sku(&self, sku: &Sku) -> Result<Vec<LogEntry>, AuditLogError> {
        let state = self.state.read().map_err(|_| AuditLogError::Poisoned)?;
        Ok(state
            .by_sku
            .get(sku)
            .map(|entries| {
                entries
                    .values()
                    .map(|&idx| state.entries[idx].clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn len(&self) -> Result<usize, AuditLogError> {
        let state = self.state.read().map_err(|_| AuditLogError::Poisoned)?;
        Ok(state.entries.len())
    }
}
