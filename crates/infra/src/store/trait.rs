use chrono::{DateTime, Utc};
use thiserror::Error;

use stockroom_core::{Sku, WarehouseId};
use stockroom_inventory::{Item, NewItem};
use std::sync::Arc;

/// Result of a compare-and-swap attempt.
///
/// A mismatch is an expected outcome under contention, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The swap was applied; carries the item as committed (version bumped by 1).
    Committed(Item),
    /// The stored version moved on since the caller read it. Nothing changed.
    VersionMismatch { expected: u64, actual: u64 },
}

impl CasOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CasOutcome::Committed(_))
    }
}

/// Versioned store operation error.
///
/// These are failures of the store itself or of the caller's addressing,
/// as opposed to the expected [`CasOutcome::VersionMismatch`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item not found: {0}")]
    NotFound(Sku),

    #[error("duplicate sku: {0}")]
    DuplicateSku(Sku),

    #[error("invalid quantity for {sku}: {quantity}")]
    InvalidQuantity { sku: Sku, quantity: i64 },

    #[error("store lock poisoned")]
    Poisoned,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Items keyed by SKU with an atomic, version-checked update.
///
/// ## Compare-and-swap semantics
///
/// `compare_and_swap(sku, expected_version, new_quantity, at)`:
/// - if the stored version equals `expected_version`, sets the quantity,
///   bumps the version by exactly 1, stamps `updated_at`, and returns
///   [`CasOutcome::Committed`]
/// - otherwise returns [`CasOutcome::VersionMismatch`] without side effects
///
/// When several callers present the same `expected_version` concurrently,
/// exactly one of them commits.
///
/// ## Listing
///
/// `list` and `list_by_warehouse` return items in insertion order.
pub trait VersionedStore: Send + Sync {
    fn get(&self, sku: &Sku) -> Result<Option<Item>, StoreError>;

    fn compare_and_swap(
        &self,
        sku: &Sku,
        expected_version: u64,
        new_quantity: i64,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError>;

    /// Insert a new item at version 0. Fails on a duplicate SKU.
    fn insert(&self, item: NewItem, at: DateTime<Utc>) -> Result<Item, StoreError>;

    fn list(&self) -> Result<Vec<Item>, StoreError>;

    fn list_by_warehouse(&self, warehouse_id: &WarehouseId) -> Result<Vec<Item>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;
}

impl<S> VersionedStore for Arc<S>
where
    S: VersionedStore + ?Sized,
{
    fn get(&self, sku: &Sku) -> Result<Option<Item>, StoreError> {
        (**self).get(sku)
    }

    fn compare_and_swap(
        &self,
        sku: &Sku,
        expected_version: u64,
        new_quantity: i64,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError> {
        (**self).compare_and_swap(sku, expected_version, new_quantity, at)
    }

    fn insert(&self, item: NewItem, at: DateTime<Utc>) -> Result<Item, StoreError> {
        (**self).insert(item, at)
    }

    fn list(&self) -> Result<Vec<Item>, StoreError> {
        (**self).list()
    }

    fn list_by_warehouse(&self, warehouse_id: &WarehouseId) -> Result<Vec<Item>, StoreError> {
        (**self).list_by_warehouse(warehouse_id)
    }

    fn count(&self) -> Result<usize, StoreError> {
        (**self).count()
    }
}
