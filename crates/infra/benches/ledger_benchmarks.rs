use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use hemobank_core::{BloodType, DonorId};
use hemobank_events::{EventEnvelope, InMemoryEventBus};
use hemobank_infra::event_store::InMemoryEventStore;
use hemobank_infra::service::LedgerService;

type Bus = Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>;
type Service = LedgerService<InMemoryEventStore, Bus>;

/// Naive CRUD simulation: direct counter updates, no events, no history.
/// Baseline for the cost of the event-sourced pipeline.
#[derive(Debug, Default)]
struct NaiveBank {
    inner: RwLock<NaiveState>,
}

#[derive(Debug, Default)]
struct NaiveState {
    donors: HashMap<DonorId, u64>,
    levels: [u64; BloodType::COUNT],
    total_donated: u64,
    total_spent: u64,
}

impl NaiveBank {
    fn register(&self, donor: DonorId) {
        let mut state = self.inner.write().unwrap();
        state.donors.entry(donor).or_insert(0);
    }

    fn donate(&self, donor: &DonorId, blood_type: BloodType, units: u64) {
        let mut state = self.inner.write().unwrap();
        state.levels[blood_type.index()] += units;
        state.total_donated += units;
        if let Some(count) = state.donors.get_mut(donor) {
            *count += 1;
        }
    }

    fn request(&self, recipient: BloodType) -> Option<BloodType> {
        let mut state = self.inner.write().unwrap();
        // Exact type only; enough for a baseline.
        if state.levels[recipient.index()] > 0 {
            state.levels[recipient.index()] -= 1;
            state.total_spent += 1;
            Some(recipient)
        } else {
            None
        }
    }
}

fn setup_service() -> Service {
    let store = InMemoryEventStore::new();
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    LedgerService::new(store, bus)
}

fn bench_donation_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("donation_latency");

    group.bench_function("event_sourced_fresh", |b| {
        let service = setup_service();
        service.register_donor(DonorId::new("donor-a")).unwrap();
        b.iter(|| {
            service
                .record_donation(black_box(DonorId::new("donor-a")), BloodType::OPositive, 1)
                .unwrap();
        });
    });

    group.bench_function("naive_crud", |b| {
        let bank = NaiveBank::default();
        bank.register(DonorId::new("donor-a"));
        b.iter(|| {
            bank.donate(black_box(&DonorId::new("donor-a")), BloodType::OPositive, 1);
        });
    });

    group.finish();
}

fn bench_dispatch_with_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_with_history");

    // Rehydration cost grows with stream depth; measure a few depths.
    for depth in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("record_donation", depth), &depth, |b, &depth| {
            let service = setup_service();
            service.register_donor(DonorId::new("donor-a")).unwrap();
            for _ in 0..depth {
                service
                    .record_donation(DonorId::new("donor-a"), BloodType::ANegative, 1)
                    .unwrap();
            }
            b.iter(|| {
                service
                    .record_donation(black_box(DonorId::new("donor-a")), BloodType::ANegative, 1)
                    .unwrap();
            });
        });
    }

    group.finish();
}

fn bench_match_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_throughput");
    group.throughput(Throughput::Elements(1));

    group.bench_function("event_sourced", |b| {
        let service = setup_service();
        service.register_donor(DonorId::new("donor-a")).unwrap();
        // Deep stock so requests never exhaust mid-measurement.
        service
            .record_donation(DonorId::new("donor-a"), BloodType::ONegative, u64::MAX / 2)
            .unwrap();
        b.iter(|| {
            service.request_match(black_box(BloodType::APositive)).unwrap();
        });
    });

    group.bench_function("naive_crud", |b| {
        let bank = NaiveBank::default();
        bank.register(DonorId::new("donor-a"));
        bank.donate(&DonorId::new("donor-a"), BloodType::APositive, u64::MAX / 2);
        b.iter(|| {
            bank.request(black_box(BloodType::APositive)).unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_donation_latency,
    bench_dispatch_with_history,
    bench_match_throughput
);
criterion_main!(benches);
