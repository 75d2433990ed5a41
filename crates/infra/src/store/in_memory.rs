use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};

use stockroom_core::{Sku, WarehouseId};
use stockroom_inventory::{Item, NewItem};

use super::r#trait::{CasOutcome, StoreError, VersionedStore};

#[derive(Debug, Default)]
struct Slots {
    index: HashMap<Sku, usize>,
    /// Insertion-ordered; one mutex per item so swaps on different SKUs never wait on each other.
    items: Vec<Mutex<Item>>,
}

/// In-memory versioned store.
///
/// The outer `RwLock` is only taken for writing on insert. Compare-and-swap
/// holds the read side plus the target item's mutex for the duration of a
/// single version bump.
#[derive(Debug, Default)]
pub struct InMemoryVersionedStore {
    slots: RwLock<Slots>,
}

impl InMemoryVersionedStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(slot: &Mutex<Item>) -> Result<Item, StoreError> {
        slot.lock()
            .map(|item| item.clone())
            .map_err(|_| StoreError::Poisoned)
    }
}

impl VersionedStore for InMemoryVersionedStore {
    fn get(&self, sku: &Sku) -> Result<Option<Item>, StoreError> {
        let slots = self.slots.read().map_err(|_| StoreError::Poisoned)?;
        match slots.index.get(sku) {
            Some(&idx) => Self::snapshot(&slots.items[idx]).map(Some),
            None => Ok(None),
        }
    }

    fn compare_and_swap(
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

        let slots = self.slots.read().map_err(|_| StoreError::Poisoned)?;
        let idx = *slots
            .index
            .get(sku)
            .ok_or_else(|| StoreError::NotFound(sku.clone()))?;

        let mut item = slots.items[idx].lock().map_err(|_| StoreError::Poisoned)?;
        if item.version != expected_version {
            return Ok(CasOutcome::VersionMismatch {
                expected: expected_version,
                actual: item.version,
            });
        }

        *item = item.committed(new_quantity, at);
        Ok(CasOutcome::Committed(item.clone()))
    }

    fn insert(&self, item: NewItem, at: DateTime<Utc>) -> Result<Item, StoreError> {
        if item.quantity < 0 {
            return Err(StoreError::InvalidQuantity {
                sku: item.sku,
                quantity: item.quantity,
            });
        }

        let mut slots = self.slots.write().map_err(|_| StoreError::Poisoned)?;
        if slots.index.contains_key(&item.sku) {
            return Err(StoreError::DuplicateSku(item.sku));
        }

        let stored = item.into_item(at);
        let idx = slots.items.len();
        slots.index.insert(stored.sku.clone(), idx);
        slots.items.push(Mutex::new(stored.clone()));
        Ok(stored)
    }

    fn list(&self) -> Result<Vec<Item>, StoreError> {
        let slots = self.slots.read().map_err(|_| StoreError::Poisoned)?;
        slots.items.iter().map(Self::snapshot).collect()
    }

    fn list_by_warehouse(&self, warehouse_id: &WarehouseId) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|item| &item.warehouse_id == warehouse_id)
            .collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let slots = self.slots.read().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn sku(s: &str) -> Sku {
        Sku::new(s).unwrap()
    }

    fn wh(s: &str) -> WarehouseId {
        WarehouseId::new(s).unwrap()
    }

    fn new_item(s: &str, quantity: i64, warehouse: &str) -> NewItem {
        NewItem::new(sku(s), format!("Product {s}"), quantity, wh(warehouse)).unwrap()
    }

    fn seeded() -> InMemoryVersionedStore {
        let store = InMemoryVersionedStore::new();
        store.insert(new_item("SKU-001", 500, "WH-EAST"), Utc::now()).unwrap();
        store.insert(new_item("SKU-003", 150, "WH-WEST"), Utc::now()).unwrap();
        store.insert(new_item("SKU-002", 320, "WH-EAST"), Utc::now()).unwrap();
        store
    }

    #[test]
    fn get_returns_snapshot_or_none() {
        let store = seeded();
        let item = store.get(&sku("SKU-001")).unwrap().unwrap();
        assert_eq!(item.quantity, 500);
        assert_eq!(item.version, 0);
        assert!(store.get(&sku("SKU-404")).unwrap().is_none());
    }

    #[test]
    fn cas_with_current_version_commits() {
        let store = seeded();
        let outcome = store
            .compare_and_swap(&sku("SKU-001"), 0, 450, Utc::now())
            .unwrap();

        match outcome {
            CasOutcome::Committed(item) => {
                assert_eq!(item.quantity, 450);
                assert_eq!(item.version, 1);
            }
            other => panic!("expected commit, got {other:?}"),
        }
        assert_eq!(store.get(&sku("SKU-001")).unwrap().unwrap().version, 1);
    }

    #[test]
    fn cas_with_stale_version_has_no_side_effects() {
        let store = seeded();
        store.compare_and_swap(&sku("SKU-001"), 0, 450, Utc::now()).unwrap();

        let outcome = store
            .compare_and_swap(&sku("SKU-001"), 0, 1, Utc::now())
            .unwrap();
        assert_eq!(
            outcome,
            CasOutcome::VersionMismatch {
                expected: 0,
                actual: 1
            }
        );

        let item = store.get(&sku("SKU-001")).unwrap().unwrap();
        assert_eq!(item.quantity, 450);
        assert_eq!(item.version, 1);
    }

    #[test]
    fn cas_on_unknown_sku_is_not_found() {
        let store = seeded();
        let err = store
            .compare_and_swap(&sku("SKU-404"), 0, 1, Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn cas_refuses_negative_quantity() {
        let store = seeded();
        let err = store
            .compare_and_swap(&sku("SKU-001"), 0, -1, Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuantity { quantity: -1, .. }));
        assert_eq!(store.get(&sku("SKU-001")).unwrap().unwrap().version, 0);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = seeded();
        let err = store
            .insert(new_item("SKU-001", 1, "WH-EAST"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSku(_)));
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn listing_preserves_insertion_order() {
        let store = seeded();
        let all: Vec<_> = store.list().unwrap().into_iter().map(|i| i.sku).collect();
        assert_eq!(all, vec![sku("SKU-001"), sku("SKU-003"), sku("SKU-002")]);

        let east: Vec<_> = store
            .list_by_warehouse(&wh("WH-EAST"))
            .unwrap()
            .into_iter()
            .map(|i| i.sku)
            .collect();
        assert_eq!(east, vec![sku("SKU-001"), sku("SKU-002")]);
    }

    #[test]
    fn concurrent_swaps_on_same_version_commit_exactly_once() {
        let store = Arc::new(seeded());
        let contenders = 8;
        let barrier = Arc::new(Barrier::new(contenders));

        let handles: Vec<_> = (0..contenders)
            .map(|i| {
                let store = store.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .compare_and_swap(&sku("SKU-001"), 0, 400 + i as i64, Utc::now())
                        .unwrap()
                })
            })
            .collect();

        let outcomes: Vec<CasOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let committed = outcomes.iter().filter(|o| o.is_committed()).count();

        assert_eq!(committed, 1);
        assert_eq!(store.get(&sku("SKU-001")).unwrap().unwrap().version, 1);
    }
}
