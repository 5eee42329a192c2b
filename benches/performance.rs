//! Performance benchmarks for the tracker store and client cache.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tempfile::TempDir;
use tracker_sync::{
    CacheKey, CachedValue, Difficulty, HintConfig, HintService, JournalBackend, JournalConfig, MemoryBackend,
    MutationCache, NewTracker, NoopGenerator, OwnerId, Reconciler, RecordStore, Status, Timestamp, Tracker,
    TrackerId, TrackerPatch, TrackerServer,
};

fn owner() -> OwnerId {
    OwnerId::from("bench-user")
}

fn tracker(i: usize) -> Tracker {
    Tracker::from_new(
        owner(),
        TrackerId(format!("t-{i}")),
        NewTracker::new(format!("Problem {i}"), Difficulty::Medium, Status::Attempted),
        Timestamp::now(),
    )
}

/// Benchmark list reads with varying list sizes
fn bench_cache_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_read");

    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("list_size", size), &size, |b, &size| {
            let cache = MutationCache::default();
            let key = CacheKey::List(owner());
            cache.write(key.clone(), CachedValue::List((0..size).map(tracker).collect()));

            b.iter(|| black_box(cache.read(&key)));
        });
    }

    group.finish();
}

/// Benchmark conditional fills racing nothing
fn bench_cache_write_if(c: &mut Criterion) {
    let cache = MutationCache::default();
    let key = CacheKey::Detail(TrackerId::from("t-0"));
    let value = CachedValue::Detail(tracker(0));

    c.bench_function("cache_write_if", |b| {
        b.iter(|| {
            let base = cache.generation(&key);
            black_box(cache.write_if(key.clone(), value.clone(), base))
        })
    });
}

/// Benchmark a full optimistic update cycle: project, store write, commit, refetch
fn bench_reconcile_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_update");

    for size in [10, 100, 500] {
        group.bench_with_input(BenchmarkId::new("list_size", size), &size, |b, &size| {
            let server = Arc::new(TrackerServer::new(
                RecordStore::new(MemoryBackend::new()),
                HintService::new(NoopGenerator, HintConfig::default()),
            ));
            let reconciler = Reconciler::new(server.scoped(owner()), Arc::new(MutationCache::default()), owner());

            let mut target = None;
            for i in 0..size {
                let created = reconciler
                    .create(NewTracker::new(format!("Problem {i}"), Difficulty::Easy, Status::Attempted))
                    .unwrap();
                target = Some(created.tracker_id);
            }
            let target = target.unwrap();
            let mut attempts = 0;

            b.iter(|| {
                reconciler.list().unwrap();
                attempts += 1;
                black_box(
                    reconciler
                        .update(&target, &TrackerPatch::default().attempts(attempts))
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

/// Benchmark rollback of a failed create
fn bench_reconcile_rollback(c: &mut Criterion) {
    let server = Arc::new(TrackerServer::new(
        RecordStore::new(MemoryBackend::new()),
        HintService::new(NoopGenerator, HintConfig::default()),
    ));
    let reconciler = Reconciler::new(server.scoped(owner()), Arc::new(MutationCache::default()), owner());
    reconciler.list().unwrap();
    let input = NewTracker::new("Two Sum", Difficulty::Easy, Status::Attempted);

    c.bench_function("reconcile_rollback", |b| {
        b.iter(|| black_box(reconciler.begin_create(&input).unwrap().roll_back()))
    });
}

/// Benchmark journaled creates
fn bench_journal_create(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::new(
        JournalBackend::create(JournalConfig {
            path: dir.path().join("trackers"),
            create_if_missing: true,
            sync_writes: false,
        })
        .unwrap(),
    );

    c.bench_function("journal_create", |b| {
        b.iter(|| {
            black_box(
                store
                    .create(&owner(), NewTracker::new("Two Sum", Difficulty::Easy, Status::Attempted))
                    .unwrap(),
            )
        })
    });
}

/// Benchmark journal replay with varying journal lengths
fn bench_journal_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("journal_replay");
    group.sample_size(20);

    for entries in [100, 1000] {
        group.bench_with_input(BenchmarkId::new("entries", entries), &entries, |b, &entries| {
            let dir = TempDir::new().unwrap();
            let config = JournalConfig {
                path: dir.path().join("trackers"),
                create_if_missing: true,
                sync_writes: false,
            };
            {
                let store = RecordStore::new(JournalBackend::create(config.clone()).unwrap());
                for i in 0..entries {
                    store
                        .create(&owner(), NewTracker::new(format!("Problem {i}"), Difficulty::Hard, Status::ToReview))
                        .unwrap();
                }
            }

            b.iter(|| black_box(JournalBackend::open(config.clone()).unwrap().len()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_cache_read,
    bench_cache_write_if,
    bench_reconcile_update,
    bench_reconcile_rollback,
    bench_journal_create,
    bench_journal_replay,
);
criterion_main!(benches);
