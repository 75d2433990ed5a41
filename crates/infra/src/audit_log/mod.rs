//! Append-only audit log of committed stock mutations.
//!
//! The engine only appends; entries are never updated or deleted. Reads are
//! served either newest-first (`recent`) or as a warehouse + time range scan
//! (`query`), which is backed by a composite `(warehouse, timestamp)` index in
//! every implementation.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod r#trait;
pub mod window;

pub use in_memory::InMemoryAuditLog;
#[cfg(feature = "postgres")]
pub use postgres::PostgresAuditLog;
pub use r#trait::{AuditLog, AuditLogError, DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT};
pub use window::{DEFAULT_WINDOW_DAYS, TimeWindow};
