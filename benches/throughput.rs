use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use sleeplog::{
    night::SleepNight,
    persist::{NightStore, memory::MemoryNightStore, sqlite::SqliteNightStore},
};

fn closed(start: i64) -> SleepNight {
    SleepNight {
        end_time_ms: start + 8 * 3_600_000,
        ..SleepNight::starting_at(start)
    }
}

fn bench_inserts(c: &mut Criterion) {
    c.bench_function("sqlite_insert_1k", |b| {
        b.iter(|| {
            let mut store = SqliteNightStore::open_in_memory().expect("open");
            for i in 0..1_000i64 {
                let _ = store.insert(&closed(i)).expect("insert");
            }
        });
    });

    c.bench_function("memory_insert_10k", |b| {
        b.iter(|| {
            let mut store = MemoryNightStore::new();
            for i in 0..10_000i64 {
                let _ = store.insert(&closed(i)).expect("insert");
            }
        });
    });
}

fn bench_rating_updates(c: &mut Criterion) {
    c.bench_function("sqlite_rate_1k", |b| {
        b.iter(|| {
            let mut store = SqliteNightStore::open_in_memory().expect("open");
            for i in 0..1_000i64 {
                let _ = store.insert(&closed(i)).expect("insert");
            }
            for id in 1..=1_000i64 {
                let mut night = store.get(id).expect("get").expect("present");
                night.sleep_quality = (id % 6) as i32;
                let _ = store.update(&night).expect("update");
            }
        });
    });
}

fn bench_list_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("all_desc");
    for n in [10usize, 100, 1000] {
        let mut store = SqliteNightStore::open_in_memory().expect("open");
        for i in 0..n as i64 {
            let _ = store.insert(&closed(i)).expect("insert");
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let _ = store.all_desc().expect("list");
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_inserts, bench_rating_updates, bench_list_query);
criterion_main!(benches);
