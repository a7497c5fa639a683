// Copyright (c) 2024-present, Andrew Werner
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::{collections::BTreeMap, hint::black_box};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pprof::criterion::{Output, PProfProfiler};
use rand::{rng, rngs::SmallRng, seq::SliceRandom, RngCore, SeedableRng};

use crossbeam_skiplist::SkipMap as CrossbeamSkipMap;
use rank_skiplist::SkipMap;

const COUNTS: [usize; 3] = [1_000, 10_000, 100_000];

fn shuffled(n: usize) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..n as u64).collect();
    keys.shuffle(&mut rng());
    keys
}

fn filled(n: usize) -> SkipMap<u64, u64> {
    let mut m = SkipMap::with_rng(SmallRng::seed_from_u64(rng().next_u64()));
    for k in shuffled(n) {
        m.set(k, k);
    }
    m
}

fn bench_skipmap_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");
    for &n in &COUNTS {
        group.bench_with_input(BenchmarkId::new("CrossbeamSkipMap", n), &n, |b, &n| {
            let keys = shuffled(n);
            b.iter(|| {
                let map = CrossbeamSkipMap::new();
                for &k in &keys {
                    map.insert(k, k);
                }
            });
        });
        group.bench_with_input(BenchmarkId::new("BTreeMap", n), &n, |b, &n| {
            let keys = shuffled(n);
            b.iter(|| {
                let mut map = BTreeMap::new();
                for &k in &keys {
                    map.insert(k, k);
                }
            });
        });
        group.bench_with_input(BenchmarkId::new("SkipMap", n), &n, |b, &n| {
            let keys = shuffled(n);
            b.iter(|| {
                let mut map = SkipMap::new();
                for &k in &keys {
                    map.set(k, k);
                }
            });
        });
    }
    group.finish();
}

fn bench_skipmap_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    for &n in &COUNTS {
        group.bench_with_input(BenchmarkId::new("CrossbeamSkipMap", n), &n, |b, &n| {
            let m = CrossbeamSkipMap::new();
            for k in shuffled(n) {
                m.insert(k, k);
            }
            let mut r = rng();
            b.iter(|| black_box(m.get(&(r.next_u64() % n as u64)).map(|e| *e.value())));
        });
        group.bench_with_input(BenchmarkId::new("SkipMap", n), &n, |b, &n| {
            let m = filled(n);
            let mut r = rng();
            b.iter(|| black_box(m.get(&(r.next_u64() % n as u64))));
        });
    }
    group.finish();
}

fn bench_skipmap_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    for &n in &COUNTS {
        group.bench_with_input(BenchmarkId::new("BTreeMap", n), &n, |b, &n| {
            let m: BTreeMap<u64, u64> = shuffled(n).into_iter().map(|k| (k, k)).collect();
            let mut r = rng();
            b.iter(|| black_box(m.range(..r.next_u64() % n as u64).count()));
        });
        group.bench_with_input(BenchmarkId::new("SkipMap", n), &n, |b, &n| {
            let m = filled(n);
            let mut r = rng();
            b.iter(|| black_box(m.rank(&(r.next_u64() % n as u64))));
        });
    }
    group.finish();
}

fn bench_skipmap_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");
    for &n in &COUNTS {
        group.bench_with_input(BenchmarkId::new("BTreeMap", n), &n, |b, &n| {
            let m: BTreeMap<u64, u64> = shuffled(n).into_iter().map(|k| (k, k)).collect();
            let mut r = rng();
            b.iter(|| black_box(m.iter().nth((r.next_u64() % n as u64) as usize)));
        });
        group.bench_with_input(BenchmarkId::new("SkipMap", n), &n, |b, &n| {
            let m = filled(n);
            let mut r = rng();
            b.iter(|| black_box(m.select((r.next_u64() % n as u64) as usize + 1)));
        });
    }
    group.finish();
}

fn bench_skipmap_iter(c: &mut Criterion) {
    let mut group = c.benchmark_group("iter");
    for &n in &COUNTS {
        group.bench_with_input(BenchmarkId::new("CrossbeamSkipMap", n), &n, |b, &n| {
            let m = CrossbeamSkipMap::new();
            for k in shuffled(n) {
                m.insert(k, k);
            }
            b.iter(|| {
                m.iter().for_each(|v| {
                    black_box(v);
                })
            });
        });

        group.bench_with_input(BenchmarkId::new("SkipMap", n), &n, |b, &n| {
            let m = filled(n);
            b.iter(|| {
                m.ascend(|k, v| {
                    black_box((k, v));
                    true
                })
            });
        });
    }
    group.finish();
}

fn bench_skipmap_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    for &n in &COUNTS {
        group.bench_with_input(BenchmarkId::new("SkipMap", n), &n, |b, &n| {
            let mut m = filled(n);
            let mut r = rng();
            b.iter(|| {
                let k = r.next_u64() % n as u64;
                black_box(m.remove(&k));
                m.set(k, k);
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = bench_skipmap_set, bench_skipmap_get,
              bench_skipmap_rank, bench_skipmap_select,
              bench_skipmap_iter, bench_skipmap_churn
}
criterion_main!(benches);
