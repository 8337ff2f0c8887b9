//! # Lookup Benchmarks
//!
//! Payload decoding and area search over a synthetic tree shaped like the
//! real feed: one country, ~35 provinces, ~10 cities each.
//!
//! Run with: `cargo bench --bench lookup`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use epistat::{find_area, find_area_path, parse_payload, AreaRecord, QueryPipeline};
use serde_json::json;

fn build_tree(provinces: usize, cities: usize) -> AreaRecord {
    (0..provinces).fold(AreaRecord::new("China"), |root, p| {
        let province = (0..cities).fold(AreaRecord::new(format!("Province{}", p)), |prov, c| {
            prov.with_child(AreaRecord::new(format!("City{}-{}", p, c)))
        });
        root.with_child(province)
    })
}

fn build_body(provinces: usize, cities: usize) -> Vec<u8> {
    let inner = json!({
        "lastUpdateTime": "2022-03-01 09:00:00",
        "areaTree": [build_tree(provinces, cities)],
    });
    json!({ "code": 10000, "data": inner.to_string() })
        .to_string()
        .into_bytes()
}

/// Benchmark search at different depths
fn bench_find_area(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_area");
    let root = build_tree(35, 10);

    let targets = [
        ("root", "China".to_string()),
        ("first_province", "Province0".to_string()),
        ("last_province", "Province34".to_string()),
        ("last_city", "City34-9".to_string()),
        ("missing", "Atlantis".to_string()),
    ];

    for (label, target) in &targets {
        group.bench_with_input(BenchmarkId::from_parameter(label), target, |b, target| {
            b.iter(|| std::hint::black_box(find_area(&root, target)));
        });
    }

    group.bench_function("path_last_city", |b| {
        b.iter(|| std::hint::black_box(find_area_path(&root, "City34-9")));
    });

    group.finish();
}

/// Benchmark two-stage payload decoding by payload size
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_payload");

    for provinces in [5usize, 35, 200] {
        let body = build_body(provinces, 10);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(provinces), &body, |b, body| {
            b.iter(|| std::hint::black_box(parse_payload(body)));
        });
    }

    group.finish();
}

/// Benchmark the whole parse-then-search pipeline
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let body = build_body(35, 10);
    let pipeline = QueryPipeline::new();

    group.bench_function("found", |b| {
        b.iter(|| std::hint::black_box(pipeline.query(&body, "City20-5")));
    });

    group.bench_function("not_found", |b| {
        b.iter(|| std::hint::black_box(pipeline.query(&body, "Atlantis")));
    });

    group.finish();
}

criterion_group!(benches, bench_find_area, bench_parse, bench_pipeline);

criterion_main!(benches);
