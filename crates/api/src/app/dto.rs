use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_infra::StockUpdate;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub sku: String,
    pub quantity_change: i64,
}

#[derive(Debug, Deserialize)]
pub struct SimulateLoadQuery {
    #[serde(default = "default_simulation_sku")]
    pub sku: String,
    #[serde(default = "default_simulation_requests")]
    pub requests: usize,
}

fn default_simulation_sku() -> String {
    "SKU-001".to_string()
}

fn default_simulation_requests() -> usize {
    20
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentLogsQuery {
    pub limit: Option<usize>,
}

/// Optional RFC3339 bounds; missing bounds default to the last 30 days.
#[derive(Debug, Default, Deserialize)]
pub struct LogWindowQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UpdateStockResponse {
    pub success: bool,
    pub message: &'static str,
    pub sku: String,
    pub new_quantity: i64,
    pub version: u64,
    pub log_entry_id: u64,
}

impl From<StockUpdate> for UpdateStockResponse {
    fn from(update: StockUpdate) -> Self {
        Self {
            success: true,
            message: "Stock updated successfully",
            sku: update.sku.to_string(),
            new_quantity: update.quantity,
            version: update.version,
            log_entry_id: update.log_entry_id.value(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub inserted: usize,
    pub message: String,
}

impl SeedResponse {
    pub fn new(inserted: usize) -> Self {
        let message = if inserted == 0 {
            "Store already populated; nothing seeded".to_string()
        } else {
            format!("Seed data loaded ({inserted} items)")
        };
        Self { inserted, message }
    }
}
