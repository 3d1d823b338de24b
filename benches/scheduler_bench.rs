//! Criterion benchmarks for the swap scheduler.
//!
//! Uses synthetic fleets over a fixed station layout so the numbers track
//! search and timeline cost rather than input shape.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use swap_sched::alns::AlnsConfig;
use swap_sched::config::{SchedulerConfig, Strategy};
use swap_sched::model::{ResidentBattery, StationSlots, VehicleId, VehicleRequest};
use swap_sched::sa::SaConfig;
use swap_sched::scheduler::SwapScheduler;
use swap_sched::timeline::{recompute_timeline, ChargeModel};

// ===========================================================================
// Synthetic inputs
// ===========================================================================

const STATIONS: usize = 6;
const SLOTS_PER_STATION: usize = 4;

fn stations(rng: &mut StdRng) -> StationSlots {
    (0..STATIONS)
        .map(|_| {
            (0..SLOTS_PER_STATION)
                .map(|_| {
                    ResidentBattery::new(rng.random_range(20.0..100.0), rng.random_range(0.0..800.0))
                })
                .collect()
        })
        .collect()
}

fn fleet(n: usize, rng: &mut StdRng) -> BTreeMap<VehicleId, VehicleRequest> {
    (0..n as VehicleId)
        .map(|id| {
            let mut request =
                VehicleRequest::new(rng.random_range(5.0..60.0), rng.random_range(0.0..1500.0));
            for _ in 0..STATIONS {
                request = if rng.random_bool(0.9) {
                    request.with_candidate(rng.random_range(1.0..25.0), rng.random_range(2.0..45.0))
                } else {
                    request.with_unreachable()
                };
            }
            (id, request)
        })
        .collect()
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_alns_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("alns_schedule");
    group.sample_size(10);

    for &n in &[20usize, 50, 100] {
        let mut rng = StdRng::seed_from_u64(42);
        let input = (fleet(n, &mut rng), stations(&mut rng));
        let config = SchedulerConfig::default()
            .with_alns(AlnsConfig::default().with_max_iterations(300))
            .with_seed(42);
        let scheduler = SwapScheduler::new(config).expect("valid config");

        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, (requests, slots)| {
            b.iter(|| {
                let outcome = scheduler.schedule(black_box(requests), black_box(slots));
                black_box(outcome)
            })
        });
    }
    group.finish();
}

fn bench_sa_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("sa_schedule");
    group.sample_size(10);

    for &n in &[20usize, 50, 100] {
        let mut rng = StdRng::seed_from_u64(7);
        let input = (fleet(n, &mut rng), stations(&mut rng));
        let config = SchedulerConfig::default()
            .with_strategy(Strategy::Annealing)
            .with_sa(SaConfig::default().with_max_iterations(300))
            .with_seed(7);
        let scheduler = SwapScheduler::new(config).expect("valid config");

        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, (requests, slots)| {
            b.iter(|| {
                let outcome = scheduler.schedule(black_box(requests), black_box(slots));
                black_box(outcome)
            })
        });
    }
    group.finish();
}

fn bench_timeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline_recompute");
    let model = ChargeModel::new(100.0 / 240.0, 80.0);

    for &n in &[50usize, 200, 1000] {
        let mut rng = StdRng::seed_from_u64(3);
        let requests = fleet(n, &mut rng);
        let slots = stations(&mut rng);
        let scheduler = SwapScheduler::new(
            SchedulerConfig::default()
                .with_alns(AlnsConfig::default().with_max_iterations(1))
                .with_seed(3),
        )
        .expect("valid config");
        let solution = scheduler
            .schedule(&requests, &slots)
            .expect("valid input")
            .solution;

        group.bench_with_input(BenchmarkId::from_parameter(n), &solution, |b, solution| {
            b.iter(|| {
                let timed = recompute_timeline(black_box(solution), &requests, &slots, &model);
                black_box(timed)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_alns_schedule, bench_sa_schedule, bench_timeline);
criterion_main!(benches);
