//! Idempotent demo-data seeding.

use tracing::info;

use stockroom_core::{Clock, DomainError};
use stockroom_inventory::default_catalog;

use crate::store::{StoreError, VersionedStore};

/// Insert the default catalog when the store is empty; otherwise do nothing.
///
/// Returns the number of items inserted. Two concurrent seeders may both see
/// an empty store; the loser's inserts fail with [`StoreError::DuplicateSku`],
/// which is treated as "already seeded".
pub fn seed_if_empty<S>(store: &S, clock: &dyn Clock) -> Result<usize, StoreError>
where
    S: VersionedStore + ?Sized,
{
    if store.count()? > 0 {
        return Ok(0);
    }

    let catalog = default_catalog().map_err(|e: DomainError| StoreError::Backend(e.to_string()))?;
    let now = clock.now();
    let mut inserted = 0;

    for item in catalog {
        match store.insert(item, now) {
            Ok(_) => inserted += 1,
            Err(StoreError::DuplicateSku(sku)) => {
                info!(%sku, "item already present; skipping");
            }
            Err(e) => return Err(e),
        }
    }

    info!(inserted, "seeded inventory items");
    Ok(inserted)
}
