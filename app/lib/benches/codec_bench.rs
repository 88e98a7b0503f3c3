use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use vtile::{
    build_report, decode_binary, decode_json, encode_binary, encode_json, ColumnDescriptor,
    ColumnType, DataPoint, JsonIndent, Meta, Tile, TileDecoder,
};

fn sample_tile(points: usize) -> Tile {
    let cols = vec![
        ColumnDescriptor::new("id", ColumnType::Int),
        ColumnDescriptor::new("height", ColumnType::Float),
        ColumnDescriptor::new("name", ColumnType::String),
        ColumnDescriptor::new("visible", ColumnType::Bool),
    ];
    let data = (0..points)
        .map(|i| {
            let point = DataPoint::new()
                .with("id", i as i64)
                .with("height", i as f64 * 0.25);
            if i % 3 == 0 {
                point.with("name", format!("feature-{}", i))
            } else {
                point.with("visible", i % 2 == 0)
            }
        })
        .collect();
    Tile::new(Meta::new(), cols, data).unwrap()
}

fn bench_binary(c: &mut Criterion) {
    let mut group = c.benchmark_group("binary");
    for points in [1_000usize, 100_000] {
        let tile = sample_tile(points);
        let bytes = encode_binary(&tile);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", points), &tile, |b, tile| {
            b.iter(|| encode_binary(black_box(tile)))
        });
        group.bench_with_input(BenchmarkId::new("decode", points), &bytes, |b, bytes| {
            b.iter(|| decode_binary(black_box(bytes)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("decode_column", points), &bytes, |b, bytes| {
            let decoder = TileDecoder::new();
            b.iter(|| decoder.decode_column(black_box(bytes), "height").unwrap())
        });
    }
    group.finish();
}

fn bench_json(c: &mut Criterion) {
    let tile = sample_tile(10_000);
    let text = encode_json(&tile, JsonIndent::Compact).unwrap();
    c.bench_function("json encode 10k", |b| {
        b.iter(|| encode_json(black_box(&tile), JsonIndent::Compact).unwrap())
    });
    c.bench_function("json decode 10k", |b| {
        b.iter(|| decode_json(black_box(&text)).unwrap())
    });
}

fn bench_report(c: &mut Criterion) {
    let tile = sample_tile(100_000);
    c.bench_function("report 100k", |b| b.iter(|| build_report(black_box(&tile)).unwrap()));
}

criterion_group!(benches, bench_binary, bench_json, bench_report);
criterion_main!(benches);
