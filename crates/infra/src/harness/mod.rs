//! Load simulation against a single SKU.
//!
//! The harness fires `request_count` stock updates at one item through a
//! bounded [`WorkerPool`], waits for all of them, and then reads the final
//! item state. It exists to exercise the engine's conflict semantics under
//! contention; it never retries a conflicted attempt.

pub mod pool;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, trace};
use uuid::Uuid;

use stockroom_core::Sku;

use crate::audit_log::AuditLog;
use crate::engine::{MutationEngine, StockError, StockUpdate};
use crate::store::VersionedStore;

pub use pool::{PoolError, WorkerPool};

/// Upper bound on simultaneously active simulation workers.
pub const DEFAULT_MAX_WORKERS: usize = 20;

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Pool size is `min(request_count, max_workers)`.
    pub max_workers: usize,
    /// Stock change applied by every attempt.
    pub delta: i64,
    /// Detail recorded on the audit entries of committed attempts.
    pub detail: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            delta: -1,
            detail: "Load simulation".to_string(),
        }
    }
}

impl HarnessConfig {
    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = max;
        self
    }

    pub fn with_delta(mut self, delta: i64) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Terminal state of one attempt. Attempts start pending and end in exactly one of these.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Committed,
    Conflicted,
    Rejected,
}

impl AttemptOutcome {
    pub fn classify(result: &Result<StockUpdate, StockError>) -> Self {
        match result {
            Ok(_) => AttemptOutcome::Committed,
            Err(e) if e.is_committed() => AttemptOutcome::Committed,
            Err(StockError::Conflict(_)) => AttemptOutcome::Conflicted,
            Err(_) => AttemptOutcome::Rejected,
        }
    }
}

/// Why attempts did not succeed. `conflicted`, `rejected` and `failed` are
/// folded into `conflict_count`; `unlogged` attempts committed and are part of
/// `success_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeBreakdown {
    /// Version mismatch at commit.
    pub conflicted: usize,
    /// Unknown SKU or insufficient stock.
    pub rejected: usize,
    /// Backend failures.
    pub failed: usize,
    /// Committed, but the audit entry was not written.
    pub unlogged: usize,
}

impl OutcomeBreakdown {
    fn record(&mut self, err: &StockError) {
        if err.is_retryable() {
            self.conflicted += 1;
        } else if err.is_rejection() {
            self.rejected += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.conflicted + self.rejected + self.failed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub run_id: Uuid,
    pub sku: Sku,
    pub total_requests: usize,
    pub success_count: usize,
    /// Every attempt that did not commit, whatever the reason.
    pub conflict_count: usize,
    pub final_quantity: Option<i64>,
    pub final_version: Option<u64>,
    pub duration_ms: u64,
    pub workers: usize,
    pub breakdown: OutcomeBreakdown,
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to read final state: {0}")]
    FinalState(#[from] StockError),
}

/// Drives concurrent `update_stock` calls against one SKU.
pub struct ConcurrencyHarness<S, L> {
    engine: Arc<MutationEngine<S, L>>,
    config: HarnessConfig,
}

impl<S, L> ConcurrencyHarness<S, L>
where
    S: VersionedStore,
    L: AuditLog,
{
    pub fn new(engine: Arc<MutationEngine<S, L>>) -> Self {
        Self::with_config(engine, HarnessConfig::default())
    }

    pub fn with_config(engine: Arc<MutationEngine<S, L>>, config: HarnessConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run `request_count` attempts and summarize them.
    ///
    /// Blocks until every attempt has finished; the final quantity and
    /// version are read only after that point.
    pub fn simulate(
        &self,
        sku: &Sku,
        request_count: usize,
    ) -> Result<SimulationSummary, HarnessError> {
        let run_id = Uuid::now_v7();
        let workers = request_count.min(self.config.max_workers.max(1));
        let pool = WorkerPool::new(format!("simulate-{}", sku), workers);

        info!(%run_id, %sku, request_count, workers, "load simulation started");
        let started = Instant::now();

        let engine = self.engine.as_ref();
        let delta = self.config.delta;
        let detail = self.config.detail.as_str();
        let results = pool.run(vec![(); request_count], |()| {
            let result = engine.update_stock_with_detail(sku, delta, detail);
            trace!(outcome = ?AttemptOutcome::classify(&result), "attempt finished");
            result
        })?;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut success_count = 0;
        let mut breakdown = OutcomeBreakdown::default();
        for result in &results {
            match result {
                Ok(_) => success_count += 1,
                Err(e) if e.is_committed() => {
                    success_count += 1;
                    breakdown.unlogged += 1;
                }
                Err(e) => breakdown.record(e),
            }
        }

        let final_state = match self.engine.item(sku) {
            Ok(item) => Some(item),
            Err(StockError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        let summary = SimulationSummary {
            run_id,
            sku: sku.clone(),
            total_requests: request_count,
            success_count,
            conflict_count: breakdown.total(),
            final_quantity: final_state.as_ref().map(|i| i.quantity),
            final_version: final_state.as_ref().map(|i| i.version),
            duration_ms,
            workers,
            breakdown,
        };

        info!(
            %run_id,
            total = summary.total_requests,
            success = summary.success_count,
            conflicts = summary.conflict_count,
            duration_ms,
            "load simulation complete"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockroom_core::WarehouseId;
    use stockroom_inventory::NewItem;

    use crate::audit_log::InMemoryAuditLog;
    use crate::store::InMemoryVersionedStore;

    type TestEngine = MutationEngine<InMemoryVersionedStore, InMemoryAuditLog>;

    fn sku() -> Sku {
        Sku::new("SKU-001").unwrap()
    }

    fn engine_with(quantity: i64) -> Arc<TestEngine> {
        let engine = MutationEngine::new(InMemoryVersionedStore::new(), InMemoryAuditLog::new());
        engine
            .store()
            .insert(
                NewItem::new(sku(), "Industrial Servo Motor", quantity, WarehouseId::new("WH-EAST").unwrap())
                    .unwrap(),
                Utc::now(),
            )
            .unwrap();
        Arc::new(engine)
    }

    #[test]
    fn summary_accounts_for_every_request() {
        let engine = engine_with(500);
        let harness = ConcurrencyHarness::new(engine.clone());

        let summary = harness.simulate(&sku(), 200).unwrap();

        assert_eq!(summary.total_requests, 200);
        assert_eq!(summary.success_count + summary.conflict_count, 200);
        assert_eq!(summary.workers, DEFAULT_MAX_WORKERS);
        assert_eq!(summary.final_quantity, Some(500 - summary.success_count as i64));
        assert_eq!(summary.final_version, Some(summary.success_count as u64));
        assert_eq!(
            engine.logs_for_sku(&sku()).unwrap().len(),
            summary.success_count
        );
    }

    #[test]
    fn workers_are_bounded_by_request_count() {
        let harness = ConcurrencyHarness::new(engine_with(10));
        let summary = harness.simulate(&sku(), 3).unwrap();
        assert_eq!(summary.workers, 3);
        assert!(summary.success_count >= 1);
    }

    #[test]
    fn single_worker_never_conflicts() {
        let harness = ConcurrencyHarness::with_config(
            engine_with(50),
            HarnessConfig::default().with_max_workers(1),
        );
        let summary = harness.simulate(&sku(), 30).unwrap();
        assert_eq!(summary.success_count, 30);
        assert_eq!(summary.conflict_count, 0);
        assert_eq!(summary.final_quantity, Some(20));
    }

    #[test]
    fn exhausted_stock_counts_as_conflict_but_is_broken_down() {
        let harness = ConcurrencyHarness::with_config(
            engine_with(5),
            HarnessConfig::default().with_max_workers(1),
        );
        let summary = harness.simulate(&sku(), 8).unwrap();
        assert_eq!(summary.success_count, 5);
        assert_eq!(summary.conflict_count, 3);
        assert_eq!(summary.breakdown.rejected, 3);
        assert_eq!(summary.breakdown.conflicted, 0);
        assert_eq!(summary.final_quantity, Some(0));
    }

    #[test]
    fn unknown_sku_reports_no_final_state() {
        let harness = ConcurrencyHarness::new(engine_with(5));
        let missing = Sku::new("SKU-404").unwrap();
        let summary = harness.simulate(&missing, 4).unwrap();
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.conflict_count, 4);
        assert_eq!(summary.breakdown.rejected, 4);
        assert_eq!(summary.final_quantity, None);
        assert_eq!(summary.final_version, None);
    }

    #[test]
    fn zero_requests_is_a_no_op() {
        let harness = ConcurrencyHarness::new(engine_with(5));
        let summary = harness.simulate(&sku(), 0).unwrap();
        assert_eq!(summary.workers, 0);
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.final_quantity, Some(5));
    }

    #[test]
    fn classify_maps_terminal_states() {
        let conflict: Result<StockUpdate, StockError> = Err(StockError::Conflict(sku()));
        let missing: Result<StockUpdate, StockError> = Err(StockError::NotFound(sku()));
        assert_eq!(AttemptOutcome::classify(&conflict), AttemptOutcome::Conflicted);
        assert_eq!(AttemptOutcome::classify(&missing), AttemptOutcome::Rejected);

        let unlogged: Result<StockUpdate, StockError> = Err(StockError::UnloggedCommit {
            sku: sku(),
            version: 3,
            source: crate::audit_log::AuditLogError::Backend("down".to_string()),
        });
        assert_eq!(AttemptOutcome::classify(&unlogged), AttemptOutcome::Committed);
    }

    #[test]
    fn configured_detail_lands_on_audit_entries() {
        let engine = engine_with(10);
        let harness = ConcurrencyHarness::with_config(
            engine.clone(),
            HarnessConfig::default().with_max_workers(1).with_detail("nightly drill"),
        );
        assert_eq!(harness.config().detail, "nightly drill");

        harness.simulate(&sku(), 3).unwrap();

        let entries = engine.logs_for_sku(&sku()).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.details.as_deref() == Some("nightly drill")));
    }
}
