//! Infrastructure layer: versioned store, audit log, mutation engine, load harness.

pub mod audit_log;
pub mod engine;
pub mod harness;
pub mod seed;
pub mod store;


pub use engine::{MutationEngine, StockError, StockUpdate};
pub use harness::{ConcurrencyHarness, HarnessConfig, SimulationSummary};
