use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Sku, Versioned, WarehouseId};

/// Snapshot of a stock item as held by the versioned store.
///
/// `quantity` is never negative and `version` increases by exactly one per
/// committed mutation. Both are only changed through the store's
/// compare-and-swap path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub sku: Sku,
    pub product_name: String,
    pub quantity: i64,
    pub warehouse_id: WarehouseId,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Validate a stock change and return the resulting quantity.
    ///
    /// Does not mutate anything; the caller commits the returned quantity
    /// against the version it read.
    pub fn plan_adjustment(&self, delta: i64) -> DomainResult<i64> {
        let new_quantity = self.quantity.checked_add(delta).ok_or_else(|| {
            DomainError::validation(format!(
                "quantity overflow for SKU {}. Current: {}, requested change: {}",
                self.sku, self.quantity, delta
            ))
        })?;

        if new_quantity < 0 {
            return Err(DomainError::invariant(format!(
                "Insufficient stock for SKU {}. Current: {}, requested change: {}",
                self.sku, self.quantity, delta
            )));
        }

        Ok(new_quantity)
    }

    /// The state after committing `new_quantity` at `at`.
    ///
    /// `updated_at` never moves backwards for one item, so commit order and
    /// timestamp order agree even if the wall clock steps back.
    pub fn committed(&self, new_quantity: i64, at: DateTime<Utc>) -> Item {
        Item {
            quantity: new_quantity,
            version: self.next_version(),
            updated_at: at.max(self.updated_at),
            ..self.clone()
        }
    }
}

impl Versioned for Item {
    fn version(&self) -> u64 {
        self.version
    }
}

/// An item that has not been stored yet (seed/insert input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub sku: Sku,
    pub product_name: String,
    pub quantity: i64,
    pub warehouse_id: WarehouseId,
}

impl NewItem {
    pub fn new(
        sku: Sku,
        product_name: impl Into<String>,
        quantity: i64,
        warehouse_id: WarehouseId,
    ) -> DomainResult<Self> {
        let product_name = product_name.into();
        if product_name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if quantity < 0 {
            return Err(DomainError::invariant(format!(
                "initial quantity for SKU {sku} cannot be negative ({quantity})"
            )));
        }
        Ok(Self {
            sku,
            product_name,
            quantity,
            warehouse_id,
        })
    }

    /// Materialize the stored form: version 0, both timestamps set to `at`.
    pub fn into_item(self, at: DateTime<Utc>) -> Item {
        Item {
            sku: self.sku,
            product_name: self.product_name,
            quantity: self.quantity,
            warehouse_id: self.warehouse_id,
            version: 0,
            created_at: at,
            updated_at: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn test_item(quantity: i64) -> Item {
        NewItem::new(
            Sku::new("SKU-001").unwrap(),
            "Industrial Servo Motor",
            quantity,
            WarehouseId::new("WH-EAST").unwrap(),
        )
        .unwrap()
        .into_item(Utc::now())
    }

    #[test]
    fn new_items_start_at_version_zero() {
        let item = test_item(500);
        assert_eq!(item.version, 0);
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn deduction_within_stock_is_planned() {
        let item = test_item(500);
        assert_eq!(item.plan_adjustment(-50), Ok(450));
        assert_eq!(item.plan_adjustment(-500), Ok(0));
        assert_eq!(item.plan_adjustment(25), Ok(525));
    }

    #[test]
    fn overdraw_is_rejected_with_context() {
        let item = test_item(500);
        match item.plan_adjustment(-10_000) {
            Err(DomainError::InvariantViolation(msg)) => {
                assert!(msg.contains("SKU-001"));
                assert!(msg.contains("500"));
                assert!(msg.contains("-10000"));
            }
            other => panic!("expected invariant violation, got {other:?}"),
        }
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let item = test_item(i64::MAX);
        assert!(matches!(item.plan_adjustment(1), Err(DomainError::Validation(_))));
    }

    #[test]
    fn commit_bumps_version_and_keeps_identity() {
        let item = test_item(500);
        let later = item.updated_at + Duration::seconds(1);
        let next = item.committed(450, later);

        assert_eq!(next.quantity, 450);
        assert_eq!(next.version, 1);
        assert_eq!(next.sku, item.sku);
        assert_eq!(next.created_at, item.created_at);
        assert_eq!(next.updated_at, later);
    }

    #[test]
    fn commit_timestamp_never_moves_backwards() {
        let item = test_item(10);
        let earlier = item.updated_at - Duration::seconds(30);
        let next = item.committed(9, earlier);
        assert_eq!(next.updated_at, item.updated_at);
    }

    #[test]
    fn negative_initial_quantity_is_rejected() {
        let err = NewItem::new(
            Sku::new("SKU-X").unwrap(),
            "Widget",
            -1,
            WarehouseId::new("WH-EAST").unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: applying any sequence of deltas through plan/commit keeps
        /// quantity non-negative, and version equals the number of commits.
        #[test]
        fn quantity_never_negative_and_version_counts_commits(
            start in 0i64..1_000,
            deltas in proptest::collection::vec(-200i64..200, 0..64),
        ) {
            let mut item = test_item(start);
            let mut commits = 0u64;

            for delta in deltas {
                if let Ok(q) = item.plan_adjustment(delta) {
                    item = item.committed(q, Utc::now());
                    commits += 1;
                }
                prop_assert!(item.quantity >= 0);
            }

            prop_assert_eq!(item.version, commits);
        }
    }
}
