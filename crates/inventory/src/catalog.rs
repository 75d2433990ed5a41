//! Fixed catalog inserted by `seed_if_empty`.

use stockroom_core::{DomainResult, Sku, WarehouseId};

use crate::item::NewItem;

const DEFAULT_CATALOG: [(&str, &str, i64, &str); 8] = [
    ("SKU-001", "Industrial Servo Motor", 500, "WH-EAST"),
    ("SKU-002", "Hydraulic Pressure Valve", 320, "WH-EAST"),
    ("SKU-003", "Carbon Fiber Panel 4x8", 150, "WH-WEST"),
    ("SKU-004", "Titanium Fastener Kit", 1200, "WH-WEST"),
    ("SKU-005", "Precision Ball Bearing 6205", 800, "WH-NORTH"),
    ("SKU-006", "Copper Busbar 200A", 250, "WH-NORTH"),
    ("SKU-007", "Thermal Interface Compound", 600, "WH-SOUTH"),
    ("SKU-008", "Stainless Flex Coupling", 420, "WH-SOUTH"),
];

/// The demo catalog, in insertion order.
pub fn default_catalog() -> DomainResult<Vec<NewItem>> {
    DEFAULT_CATALOG
        .iter()
        .map(|(sku, name, quantity, warehouse)| {
            NewItem::new(Sku::new(sku)?, *name, *quantity, WarehouseId::new(warehouse)?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_valid_and_unique() {
        let items = default_catalog().unwrap();
        assert_eq!(items.len(), 8);

        let mut skus: Vec<_> = items.iter().map(|i| i.sku.clone()).collect();
        skus.sort();
        skus.dedup();
        assert_eq!(skus.len(), 8);

        assert_eq!(items[0].sku.as_str(), "SKU-001");
        assert_eq!(items[0].quantity, 500);
    }
}
