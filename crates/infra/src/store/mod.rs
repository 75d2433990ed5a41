//! Versioned item store boundary.
//!
//! Items are keyed by SKU and tagged with a version. The only way to change a
//! stored quantity is [`VersionedStore::compare_and_swap`], which is the sole
//! synchronization primitive of the engine: no caller takes a lock that spans
//! the read and the write.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryVersionedStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresVersionedStore;
pub use r#trait::{CasOutcome, StoreError, VersionedStore};
