//! # MLBF Filter Benchmarks
//!
//! Timings for the pieces of a generation cycle:
//!
//! | Stage | Cost driver |
//! |-------|-------------|
//! | Snapshot build | one range check per corpus version |
//! | Filter build | k hashes per entry, both layers |
//! | Lookup | at most 2k bit probes |
//! | Stash diff | set difference over blocked keys |
//! | Regex decomposition | one pass over the pattern |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mlbf_blocklist::domain::{join_guids_to_regex, split_regex_to_list, ChainHead};
use mlbf_blocklist::{BlockRecord, Mlbf, MlbfConfig, MlbfEntrySet, Stash, VersionCorpus};
use rand::Rng;
use std::time::Duration;

const VERSIONS: [&str; 4] = ["1.0", "1.5", "2.0", "3.0"];

fn guid(i: usize) -> String {
    format!("addon-{i}@bench")
}

/// `addons` add-ons with four versions each; every other add-on blocked
/// from 1.5 up
fn corpus_and_records(addons: usize) -> (VersionCorpus, Vec<BlockRecord>) {
    let mut corpus = VersionCorpus::new("bench-db");
    let mut records = Vec::with_capacity(addons / 2);
    for i in 0..addons {
        corpus = corpus.with_versions(&guid(i), VERSIONS);
        if i % 2 == 0 {
            records.push(BlockRecord::new(guid(i)).with_range("1.5", "*"));
        }
    }
    (corpus, records)
}

fn snapshot(generation_time: u64, addons: usize) -> MlbfEntrySet {
    let (corpus, records) = corpus_and_records(addons);
    MlbfEntrySet::build(generation_time, &records, &corpus, 1024).0
}

fn bench_snapshot_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot-build");
    group.measurement_time(Duration::from_secs(10));

    for addons in [1_000, 10_000] {
        let (corpus, records) = corpus_and_records(addons);
        group.throughput(Throughput::Elements((addons * VERSIONS.len()) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(addons), &addons, |b, _| {
            b.iter(|| black_box(MlbfEntrySet::build(1, &records, &corpus, 1024)))
        });
    }
    group.finish();
}

fn bench_filter_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter-build");
    group.measurement_time(Duration::from_secs(10));
    let config = MlbfConfig::default();

    for addons in [1_000, 10_000, 50_000] {
        let set = snapshot(1, addons);
        group.throughput(Throughput::Elements(set.blocked().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(addons), &set, |b, set| {
            b.iter(|| black_box(Mlbf::build(set, &config)))
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter-lookup");
    let set = snapshot(1, 10_000);
    let Ok((filter, _)) = Mlbf::build(&set, &MlbfConfig::default()) else {
        return;
    };
    let mut rng = rand::thread_rng();
    let queries: Vec<(String, &str)> = (0..1_000)
        .map(|_| {
            // A third of the queries fall outside the corpus
            let i = rng.gen_range(0..15_000);
            (guid(i), VERSIONS[rng.gen_range(0..VERSIONS.len())])
        })
        .collect();

    group.throughput(Throughput::Elements(queries.len() as u64));
    group.bench_function("mixed_1000", |b| {
        b.iter(|| {
            queries
                .iter()
                .filter(|(g, v)| filter.is_blocked(black_box(g), black_box(v)))
                .count()
        })
    });
    group.finish();
}

fn bench_stash_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("stash-diff");
    let (corpus, mut records) = corpus_and_records(20_000);
    let old = MlbfEntrySet::build(1, &records, &corpus, 1024).0;

    // ~1% churn: unblock a slice, block a few previously clean add-ons
    records.drain(..50);
    records.extend((0..50).map(|i| BlockRecord::new(guid(2 * i + 1))));
    let new = MlbfEntrySet::build(2, &records, &corpus, 1024).0;
    let head = ChainHead {
        base_generation_time: Some(1),
        last_generation_time: Some(1),
    };

    group.bench_function("20k_addons_1pct", |b| {
        b.iter(|| black_box(Stash::compute(&old, &new, &head)))
    });
    group.finish();
}

fn bench_regex_decomposition(c: &mut Criterion) {
    let mut group = c.benchmark_group("guid-regex");
    for ids in [10, 1_000] {
        let guids: Vec<String> = (0..ids).map(|i| format!("{{{i:08x}-0000-4000-8000-000000000000}}")).collect();
        let pattern = join_guids_to_regex(&guids);
        group.throughput(Throughput::Bytes(pattern.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(ids), &pattern, |b, pattern| {
            b.iter(|| black_box(split_regex_to_list(pattern)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_snapshot_build,
    bench_filter_build,
    bench_lookup,
    bench_stash_diff,
    bench_regex_decomposition
);
criterion_main!(benches);
