use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, LogEntryId, Sku, WarehouseId};

use crate::item::Item;

/// Direction of a committed stock change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockAction {
    Restock,
    Deduct,
}

impl StockAction {
    /// `Restock` for `delta >= 0`, `Deduct` otherwise.
    pub fn from_delta(delta: i64) -> Self {
        if delta >= 0 {
            StockAction::Restock
        } else {
            StockAction::Deduct
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockAction::Restock => "RESTOCK",
            StockAction::Deduct => "DEDUCT",
        }
    }
}

impl core::fmt::Display for StockAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESTOCK" => Ok(StockAction::Restock),
            "DEDUCT" => Ok(StockAction::Deduct),
            other => Err(DomainError::validation(format!("unknown stock action '{other}'"))),
        }
    }
}

/// An audit entry ready to be appended (not yet assigned a sequence id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLogEntry {
    pub warehouse_id: WarehouseId,
    pub sku: Sku,
    pub action: StockAction,
    pub quantity_change: i64,
    pub resulting_quantity: i64,
    /// Version the commit produced; orders entries of one SKU.
    pub item_version: u64,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
}

impl NewLogEntry {
    /// Describe a commit from the item state it produced.
    ///
    /// The timestamp is the commit's `updated_at`, so log order follows
    /// commit order for the SKU.
    pub fn for_commit(committed: &Item, quantity_change: i64, details: Option<String>) -> Self {
        Self {
            warehouse_id: committed.warehouse_id.clone(),
            sku: committed.sku.clone(),
            action: StockAction::from_delta(quantity_change),
            quantity_change,
            resulting_quantity: committed.quantity,
            item_version: committed.version,
            timestamp: committed.updated_at,
            details,
        }
    }

    pub fn into_entry(self, id: LogEntryId) -> LogEntry {
        LogEntry {
            id,
            warehouse_id: self.warehouse_id,
            sku: self.sku,
            action: self.action,
            quantity_change: self.quantity_change,
            resulting_quantity: self.resulting_quantity,
            item_version: self.item_version,
            timestamp: self.timestamp,
            details: self.details,
        }
    }
}

/// An immutable, appended audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub warehouse_id: WarehouseId,
    pub sku: Sku,
    pub action: StockAction,
    pub quantity_change: i64,
    pub resulting_quantity: i64,
    pub item_version: u64,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
}

impl LogEntry {
    /// Total order used by log queries: timestamp, then item version, then id.
    pub fn order_key(&self) -> (DateTime<Utc>, u64, LogEntryId) {
        (self.timestamp, self.item_version, self.id)
    }
}
