use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use markdown_blocks_engine::parsing::{ConvertOptions, parse_blocks};
use markdown_blocks_engine::performance::{Strategy, run_strategy};
use markdown_blocks_engine::{CacheOptions, EngineOptions, MarkdownEngine};
use pulldown_cmark::Parser;
mod common;

fn bench_pulldown_cmark_baseline(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    group.sample_size(10);

    let content = common::generate_markdown_content(100);
    group.bench_function("pulldown_cmark", |b| {
        b.iter(|| {
            let parser = Parser::new(std::hint::black_box(&content));
            let events: Vec<_> = parser.collect();
            std::hint::black_box(events);
        });
    });
    group.bench_function("parse_blocks", |b| {
        b.iter(|| {
            let blocks = parse_blocks(std::hint::black_box(&content), &ConvertOptions::default());
            std::hint::black_box(blocks)
        });
    });

    group.finish();
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies");
    group.sample_size(10);

    let content = common::generate_complex_markdown(200, 4);
    group.throughput(Throughput::Bytes(content.len() as u64));
    for strategy in [
        Strategy::Standard,
        Strategy::Batched,
        Strategy::Simplified,
        Strategy::Streaming,
    ] {
        group.bench_with_input(
            BenchmarkId::new("run_strategy", strategy),
            &content,
            |b, content| {
                b.iter(|| run_strategy(strategy, content, &ConvertOptions::default()));
            },
        );
    }
    group.finish();
}

fn bench_engine_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    group.sample_size(10);

    let content = common::generate_complex_markdown(50, 4);
    let cached = MarkdownEngine::default();
    group.bench_function("parse_cached", |b| {
        b.iter(|| cached.parse(std::hint::black_box(&content)));
    });

    let uncached = MarkdownEngine::new(EngineOptions {
        cache: CacheOptions {
            capacity: 0,
            ..CacheOptions::default()
        },
        ..EngineOptions::default()
    });
    group.bench_function("parse_uncached", |b| {
        b.iter(|| uncached.parse(std::hint::black_box(&content)));
    });
    group.finish();
}

criterion_group!(benches, bench_pulldown_cmark_baseline, bench_strategies, bench_engine_cache);
criterion_main!(benches);
