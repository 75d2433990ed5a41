//! Version tagging for optimistic concurrency.

/// A record tagged with a monotonically increasing version.
///
/// The version starts at 0 when a record is first stored and increases by
/// exactly 1 for every committed mutation.
pub trait Versioned {
    fn version(&self) -> u64;

    /// The version the next committed mutation will produce.
    fn next_version(&self) -> u64 {
        self.version() + 1
    }
}
