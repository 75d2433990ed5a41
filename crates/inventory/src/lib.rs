//! Inventory domain module.
//!
//! This crate contains the stock item and audit entry types plus the pure
//! rules for adjusting stock (no IO, no HTTP, no storage).

pub mod catalog;
pub mod item;
pub mod log_entry;

pub use catalog::default_catalog;
pub use item::{Item, NewItem};
pub use log_entry::{LogEntry, NewLogEntry, StockAction};
