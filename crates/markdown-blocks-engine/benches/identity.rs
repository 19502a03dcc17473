use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use markdown_blocks_engine::IdAssigner;
use markdown_blocks_engine::parsing::{ConvertOptions, parse_blocks};
mod common;

fn bench_assign(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity");
    group.sample_size(10);

    for sections in [10, 100, 500] {
        let content = common::generate_complex_markdown(sections, 4);
        let blocks = parse_blocks(&content, &ConvertOptions::default()).unwrap();
        let assigner = IdAssigner::new();

        group.bench_with_input(BenchmarkId::new("assign", sections), &blocks, |b, blocks| {
            b.iter(|| assigner.assign(blocks.clone(), content.len()));
        });

        // re-parse after a keystroke, carrying IDs over from the previous tree
        let previous = assigner.assign(blocks, content.len());
        let edited = common::apply_keystroke(&content);
        let edited_blocks = parse_blocks(&edited, &ConvertOptions::default()).unwrap();
        group.bench_with_input(
            BenchmarkId::new("assign_preserving", sections),
            &edited_blocks,
            |b, blocks| {
                b.iter(|| assigner.assign_preserving(blocks.clone(), edited.len(), &previous));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_assign);
criterion_main!(benches);
