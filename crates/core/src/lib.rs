//! `stockroom-core`: shared building blocks for the stock engine.
//!
//! This crate contains **pure** primitives (no storage, no IO beyond reading
//! the system clock through [`SystemClock`]).

pub mod clock;
pub mod error;
pub mod id;
pub mod version;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{LogEntryId, Sku, WarehouseId};
pub use version::Versioned;
