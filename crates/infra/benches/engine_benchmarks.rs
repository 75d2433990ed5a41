use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, Utc};
use std::sync::Arc;
use stockroom_core::{Sku, WarehouseId};
use stockroom_infra::audit_log::{AuditLog, InMemoryAuditLog, TimeWindow};
use stockroom_infra::harness::{ConcurrencyHarness, HarnessConfig};
use stockroom_infra::store::InMemoryVersionedStore;
use stockroom_infra::MutationEngine;
use stockroom_inventory::{NewLogEntry, StockAction};

type Engine = MutationEngine<InMemoryVersionedStore, InMemoryAuditLog>;

fn seeded_engine() -> Arc<Engine> {
    let engine = MutationEngine::new(InMemoryVersionedStore::new(), InMemoryAuditLog::new());
    engine.seed_if_empty().unwrap();
    Arc::new(engine)
}

fn bench_uncontended_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_stock");
    group.throughput(Throughput::Elements(1));

    // Alternating restock/deduct keeps the quantity bounded across iterations.
    group.bench_function("uncontended", |b| {
        let engine = seeded_engine();
        let sku = Sku::new("SKU-004").unwrap();
        let mut delta = 1;

        b.iter(|| {
            delta = -delta;
            black_box(engine.update_stock(&sku, black_box(delta)).unwrap());
        });
    });

    group.finish();
}

fn bench_contended_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate_load");

    for workers in [1usize, 4, 20].iter() {
        group.throughput(Throughput::Elements(100));
        group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, &w| {
            let engine = seeded_engine();
            let harness = ConcurrencyHarness::with_config(
                engine.clone(),
                HarnessConfig::default().with_max_workers(w).with_delta(0),
            );
            let sku = Sku::new("SKU-001").unwrap();

            b.iter(|| black_box(harness.simulate(&sku, 100).unwrap()));
        });
    }

    group.finish();
}

fn bench_log_range_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("audit_log_query");

    for size in [1_000usize, 10_000, 100_000].iter() {
        let log = InMemoryAuditLog::new();
        let t0 = Utc::now();
        let warehouses = ["WH-EAST", "WH-WEST", "WH-NORTH", "WH-SOUTH"];

        for i in 0..*size {
            let wh = warehouses[i % warehouses.len()];
            log.append(NewLogEntry {
                warehouse_id: WarehouseId::new(wh).unwrap(),
                sku: Sku::new(format!("SKU-{:03}", i % 8 + 1)).unwrap(),
                action: StockAction::Deduct,
                quantity_change: -1,
                resulting_quantity: 0,
                item_version: i as u64 + 1,
                timestamp: t0 + Duration::seconds(i as i64),
                details: None,
            })
            .unwrap();
        }

        // A window covering roughly one percent of the log.
        let start = t0 + Duration::seconds((*size / 2) as i64);
        let window = TimeWindow::new(start, start + Duration::seconds((*size / 100) as i64)).unwrap();
        let east = WarehouseId::new("WH-EAST").unwrap();

        group.bench_with_input(BenchmarkId::new("warehouse_window", size), size, |b, _| {
            b.iter(|| black_box(log.query(&east, window).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_uncontended_update,
    bench_contended_simulation,
    bench_log_range_query,
);
criterion_main!(benches);
