use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use planetarium_api::booking::{validate_seat, AvailabilityIndex, ReservationEngine, SeatRequest};
use planetarium_api::models::PlanetariumDome;
use planetarium_api::store::InMemoryBookingStore;

fn bench_validate_seat(c: &mut Criterion) {
    let dome = PlanetariumDome { id: 1, name: "Main".into(), rows: 20, seats_in_row: 30 };

    c.bench_function("validate_seat/in_bounds", |b| {
        b.iter(|| validate_seat(black_box(10), black_box(15), &dome))
    });
    c.bench_function("validate_seat/out_of_bounds", |b| {
        b.iter(|| validate_seat(black_box(21), black_box(31), &dome))
    });
}

fn bench_create_reservation(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let mut group = c.benchmark_group("create_reservation");

    for batch in [1usize, 5, 20] {
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.iter_batched(
                || {
                    rt.block_on(async {
                        let store = InMemoryBookingStore::new();
                        let dome = store.add_dome("Main", 20, 30).await;
                        let session = store.add_session(dome.id).await;
                        let seats: Vec<_> = (1..=batch as i32)
                            .map(|seat| SeatRequest::new(session, 1, seat))
                            .collect();
                        (ReservationEngine::new(store), seats)
                    })
                },
                |(engine, seats)| {
                    rt.block_on(engine.create_reservation(1, &seats))
                        .expect("booking")
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_available_count(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let (index, session) = rt.block_on(async {
        let store = InMemoryBookingStore::new();
        let dome = store.add_dome("Main", 20, 30).await;
        let session = store.add_session(dome.id).await;
        let engine = ReservationEngine::new(store.clone());
        for row in 1..=10 {
            let seats: Vec<_> = (1..=30).map(|seat| SeatRequest::new(session, row, seat)).collect();
            engine.create_reservation(1, &seats).await.expect("seed");
        }
        (AvailabilityIndex::new(store), session)
    });

    c.bench_function("available_count/half_full", |b| {
        b.iter(|| rt.block_on(index.available_count(black_box(session))).expect("count"))
    });
}

criterion_group!(benches, bench_validate_seat, bench_create_reservation, bench_available_count);
criterion_main!(benches);
