//! Adaptive strategy selection and the non-standard execution paths.

pub mod cache;
pub mod chunk;
pub mod complexity;
pub mod monitor;
pub mod streaming;

use std::num::NonZeroUsize;
use std::thread;

use crate::blocks::Block;
use crate::error::EngineError;
use crate::parsing::{ConvertOptions, parse_blocks};

pub use cache::{CacheKey, CacheOptions, CacheStats, ParseCache};
pub use chunk::{Chunk, chunk_text};
pub use complexity::{ComplexityScore, Strategy, StrategyThresholds};
pub use monitor::{ParseMetrics, PerformanceMonitor};
pub use streaming::{STREAM_WINDOW_BYTES, StreamingParser, parse_streaming};

/// Chunk size for the batched strategy.
pub const BATCH_TARGET_BYTES: usize = 256 * 1024;

/// Runs `strategy` over `text`. Simplified and streaming runs swap in
/// simplified conversion but keep the caller's toggle setting.
pub fn run_strategy(
    strategy: Strategy,
    text: &str,
    options: &ConvertOptions,
) -> Result<Vec<Block>, EngineError> {
    let simplified = ConvertOptions::simplified().with_toggles(options.toggles);
    match strategy {
        Strategy::Standard => parse_blocks(text, options),
        Strategy::Batched => parse_batched(text, BATCH_TARGET_BYTES, |chunk| parse_blocks(chunk, options)),
        Strategy::Simplified => parse_blocks(text, &simplified),
        Strategy::Streaming => {
            parse_streaming(text, STREAM_WINDOW_BYTES, |window| parse_blocks(window, &simplified))
        }
    }
}

/// Parses blank-line-aligned chunks on scoped worker threads and joins the
/// results in chunk order, shifting each chunk's ranges into document space.
///
/// Fails with the error of the first failing chunk in document order.
pub fn parse_batched<P>(text: &str, target: usize, parse: P) -> Result<Vec<Block>, EngineError>
where
    P: Fn(&str) -> Result<Vec<Block>, EngineError> + Sync,
{
    let chunks = chunk_text(text, target);
    let workers = thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .min(chunks.len());

    let mut results: Vec<Option<Result<Vec<Block>, EngineError>>> = Vec::new();
    results.resize_with(chunks.len(), || None);

    if workers <= 1 {
        for (slot, chunk) in results.iter_mut().zip(&chunks) {
            *slot = Some(parse(chunk.text));
        }
    } else {
        let parse = &parse;
        let chunks = &chunks;
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    scope.spawn(move || {
                        chunks
                            .iter()
                            .enumerate()
                            .skip(worker)
                            .step_by(workers)
                            .map(|(i, chunk)| (i, parse(chunk.text)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (i, result) in done {
                            results[i] = Some(result);
                        }
                    }
                    Err(_) => log::warn!("batch worker panicked"),
                }
            }
        });
    }

    let mut blocks = Vec::new();
    for (chunk, result) in chunks.iter().zip(results) {
        let mut chunk_blocks = result.unwrap_or_else(|| {
            Err(EngineError::Parse {
                message: "chunk parser panicked".to_string(),
                attempts: 1,
                position: Some(chunk.offset),
            })
        })?;
        for block in &mut chunk_blocks {
            block.shift(chunk.offset);
        }
        blocks.extend(chunk_blocks);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockType;
    use pretty_assertions::assert_eq;

    fn full(text: &str) -> Result<Vec<Block>, EngineError> {
        parse_blocks(text, &ConvertOptions::default())
    }

    #[test]
    fn batched_ranges_match_the_source() {
        let text = (0..200)
            .map(|i| format!("Paragraph number {i}.\n\n"))
            .collect::<String>();
        let blocks = parse_batched(&text, 256, full).unwrap();
        assert_eq!(blocks.len(), 200);
        for (i, block) in blocks.iter().enumerate() {
            let r = block.source_range;
            assert_eq!(text[r.start..r.end].trim(), format!("Paragraph number {i}."));
        }
    }

    #[test]
    fn batched_reports_first_failing_chunk() {
        let text = "ok\n\nbad\n\nok\n\nbad two\n";
        let err = parse_batched(text, 4, |chunk| {
            if chunk.starts_with("bad") {
                Err(EngineError::parse(chunk.trim()))
            } else {
                full(chunk)
            }
        })
        .unwrap_err();
        assert_eq!(err.message(), "bad");
    }

    #[test]
    fn simplified_strategy_drops_rich_types() {
        let blocks = run_strategy(Strategy::Simplified, "> [!NOTE] x\n", &ConvertOptions::default()).unwrap();
        assert_eq!(blocks[0].block_type(), BlockType::Paragraph);

        let blocks = run_strategy(Strategy::Standard, "> [!NOTE] x\n", &ConvertOptions::default()).unwrap();
        assert_eq!(blocks[0].block_type(), BlockType::Callout);
    }

    #[test]
    fn streaming_strategy_matches_simplified_on_small_input() {
        let text = "# t\n\n- a\n- b\n";
        let streamed = run_strategy(Strategy::Streaming, text, &ConvertOptions::default()).unwrap();
        let simplified = run_strategy(Strategy::Simplified, text, &ConvertOptions::default()).unwrap();
        assert_eq!(streamed, simplified);
    }
}
