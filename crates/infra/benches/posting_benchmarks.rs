use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use stockpost_accounting::{Account, AccountKind};
use stockpost_core::{ProductVariantId, TenantId, UserId, WarehouseId};
use stockpost_events::{InMemoryEventBus, NotificationEnvelope};
use stockpost_infra::{InMemoryDatabase, LedgerService, StockpostConfig};
use stockpost_inventory::{MovementItemRequest, MovementRequest, MovementType};

type Bus = Arc<InMemoryEventBus<NotificationEnvelope<JsonValue>>>;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime")
}

fn service(rt: &tokio::runtime::Runtime, tenant_id: TenantId) -> LedgerService<InMemoryDatabase, Bus> {
    let db = InMemoryDatabase::new();
    rt.block_on(async {
        for (code, kind) in [
            ("152", AccountKind::Asset),
            ("331", AccountKind::Liability),
            ("632", AccountKind::Expense),
        ] {
            db.provision_account(Account::new(tenant_id, code, code, kind))
                .await
                .expect("provision");
        }
    });
    LedgerService::from_config(db, Arc::new(InMemoryEventBus::new()), &StockpostConfig::default())
}

fn request(
    movement_type: MovementType,
    from: Option<WarehouseId>,
    to: Option<WarehouseId>,
    variants: &[ProductVariantId],
) -> MovementRequest {
    MovementRequest {
        movement_type,
        from_warehouse_id: from,
        to_warehouse_id: to,
        reference: None,
        items: variants
            .iter()
            .map(|&variant_id| MovementItemRequest {
                variant_id,
                quantity: Decimal::ONE,
                batch_code: None,
                manufactured_on: None,
                expires_on: None,
            })
            .collect(),
    }
}

/// Inbound receipts with auto-posting, by number of lines per movement.
fn bench_inbound(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("inbound_movement");

    for lines in [1usize, 10, 50] {
        let tenant_id = TenantId::new();
        let user_id = UserId::new();
        let svc = service(&rt, tenant_id);
        let warehouse = WarehouseId::new();
        let variants: Vec<ProductVariantId> = (0..lines).map(|_| ProductVariantId::new()).collect();
        let req = request(MovementType::Inbound, None, Some(warehouse), &variants);

        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &req, |b, req| {
            b.iter(|| {
                rt.block_on(svc.create_movement(tenant_id, user_id, black_box(req)))
                    .expect("movement")
            })
        });
    }
    group.finish();
}

/// Transfers back and forth between two warehouses (no posting).
fn bench_transfer(c: &mut Criterion) {
    let rt = runtime();
    let tenant_id = TenantId::new();
    let user_id = UserId::new();
    let svc = service(&rt, tenant_id);
    let (a, b) = (WarehouseId::new(), WarehouseId::new());
    let variants = vec![ProductVariantId::new()];

    rt.block_on(svc.create_movement(
        tenant_id,
        user_id,
        &request(MovementType::Inbound, None, Some(a), &variants),
    ))
    .expect("seed stock");

    let there = request(MovementType::Transfer, Some(a), Some(b), &variants);
    let back = request(MovementType::Transfer, Some(b), Some(a), &variants);

    c.bench_function("transfer_round_trip", |bencher| {
        bencher.iter(|| {
            rt.block_on(svc.create_movement(tenant_id, user_id, black_box(&there)))
                .expect("transfer there");
            rt.block_on(svc.create_movement(tenant_id, user_id, black_box(&back)))
                .expect("transfer back");
        })
    });
}

criterion_group!(benches, bench_inbound, bench_transfer);
criterion_main!(benches);
