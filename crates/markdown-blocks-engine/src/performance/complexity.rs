use serde::{Deserialize, Serialize};

use crate::parsing::lines::lines_with_spans;

const KIB: usize = 1024;

/// Size, line count and structural marker density of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityScore {
    pub bytes: usize,
    pub lines: usize,
    /// Lines opening a heading, quote, table row, list item or code fence.
    pub markers: usize,
    pub score: usize,
}

impl ComplexityScore {
    /// `floor(bytes / 10 KiB) + floor(lines / 1000) + floor(markers / 100)`
    pub fn measure(text: &str) -> Self {
        let mut lines = 0;
        let mut markers = 0;
        for line in lines_with_spans(text) {
            lines += 1;
            if is_structural(line.content()) {
                markers += 1;
            }
        }
        let bytes = text.len();
        Self {
            bytes,
            lines,
            markers,
            score: bytes / (10 * KIB) + lines / 1000 + markers / 100,
        }
    }
}

fn is_structural(line: &str) -> bool {
    let t = line.trim_start();
    let b = t.as_bytes();
    match b.first() {
        Some(b'#' | b'>' | b'|') => true,
        Some(b'-' | b'*' | b'+') => matches!(b.get(1), Some(b' ' | b'\t')),
        Some(b'`') => t.starts_with("```"),
        Some(b'~') => t.starts_with("~~~"),
        Some(c) if c.is_ascii_digit() => {
            let digits = b.iter().take_while(|c| c.is_ascii_digit()).count();
            matches!(b.get(digits), Some(b'.' | b')'))
        }
        _ => false,
    }
}

/// Execution strategy for one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// One full parse.
    Standard,
    /// Blank-line-aligned chunks parsed in parallel and concatenated.
    Batched,
    /// Five basic block types, no reassembly passes.
    Simplified,
    /// Simplified parsing over fixed windows flushed through a buffer.
    Streaming,
}

impl Strategy {
    pub fn select(bytes: usize, score: usize) -> Self {
        StrategyThresholds::default().select(bytes, score)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Standard => "standard",
            Strategy::Batched => "batched",
            Strategy::Simplified => "simplified",
            Strategy::Streaming => "streaming",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cut-offs for [`Strategy`] selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StrategyThresholds {
    /// Scores up to this parse in one go.
    pub standard_max_score: usize,
    /// Scores up to this stay whole or batched; above it, simplified.
    pub batched_max_score: usize,
    /// Mid-score documents larger than this are batched.
    pub batched_min_bytes: usize,
    /// High-score documents larger than this are streamed.
    pub streaming_min_bytes: usize,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            standard_max_score: 5,
            batched_max_score: 20,
            batched_min_bytes: 500 * KIB,
            streaming_min_bytes: 5 * KIB * KIB,
        }
    }
}

impl StrategyThresholds {
    pub fn select(&self, bytes: usize, score: usize) -> Strategy {
        if score <= self.standard_max_score {
            Strategy::Standard
        } else if score <= self.batched_max_score {
            if bytes > self.batched_min_bytes {
                Strategy::Batched
            } else {
                Strategy::Standard
            }
        } else if bytes > self.streaming_min_bytes {
            Strategy::Streaming
        } else {
            Strategy::Simplified
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn score_adds_the_three_terms() {
        let text = "# h\n".repeat(3000);
        let score = ComplexityScore::measure(&text);
        assert_eq!(score.bytes, 12_000);
        assert_eq!(score.lines, 3000);
        assert_eq!(score.markers, 3000);
        assert_eq!(score.score, 1 + 3 + 30);
    }

    #[rstest]
    #[case("# heading", true)]
    #[case("   > quote", true)]
    #[case("| a | b |", true)]
    #[case("- item", true)]
    #[case("-not a list", false)]
    #[case("12. twelve", true)]
    #[case("12 apples", false)]
    #[case("```rust", true)]
    #[case("plain", false)]
    fn structural_markers(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_structural(line), expected);
    }

    #[rstest]
    #[case(100, 0, Strategy::Standard)]
    #[case(100, 5, Strategy::Standard)]
    #[case(100 * KIB, 10, Strategy::Standard)]
    #[case(600 * KIB, 10, Strategy::Batched)]
    #[case(600 * KIB, 21, Strategy::Simplified)]
    #[case(6 * KIB * KIB, 21, Strategy::Streaming)]
    fn strategy_thresholds(#[case] bytes: usize, #[case] score: usize, #[case] expected: Strategy) {
        assert_eq!(Strategy::select(bytes, score), expected);
    }

    #[test]
    fn measured_large_documents_skip_batching_with_default_thresholds() {
        // size alone puts anything over 500 KiB above the batched score band
        let text = "word ".repeat(120 * KIB);
        let score = ComplexityScore::measure(&text);
        assert_eq!(Strategy::select(score.bytes, score.score), Strategy::Simplified);
    }
}
