use crate::blocks::Block;
use crate::error::EngineError;

use super::chunk::windows;

pub const STREAM_WINDOW_BYTES: usize = 64 * 1024;
pub const STREAM_FLUSH_BYTES: usize = 256 * 1024;

/// Buffers incoming windows and parses the buffer whenever it grows past the
/// flush threshold.
///
/// Blocks never join across flushes: a construct that straddles a flush
/// point comes out as two blocks.
pub struct StreamingParser<P> {
    parse: P,
    buffer: String,
    /// Document offset of `buffer[0]`.
    consumed: usize,
    flush_threshold: usize,
}

impl<P> StreamingParser<P>
where
    P: Fn(&str) -> Result<Vec<Block>, EngineError>,
{
    pub fn new(parse: P) -> Self {
        Self {
            parse,
            buffer: String::new(),
            consumed: 0,
            flush_threshold: STREAM_FLUSH_BYTES,
        }
    }

    #[must_use]
    pub fn with_flush_threshold(mut self, bytes: usize) -> Self {
        self.flush_threshold = bytes;
        self
    }

    /// Appends a window; returns whatever a flush produced.
    pub fn push(&mut self, window: &str) -> Result<Vec<Block>, EngineError> {
        self.buffer.push_str(window);
        if self.buffer.len() <= self.flush_threshold {
            return Ok(Vec::new());
        }
        // keep the tail after the last blank line for the next flush
        let cut = self
            .buffer
            .rfind("\n\n")
            .map(|i| i + 2)
            .unwrap_or(self.buffer.len());
        self.flush(cut)
    }

    /// Parses what is left in the buffer.
    pub fn finish(mut self) -> Result<Vec<Block>, EngineError> {
        let len = self.buffer.len();
        self.flush(len)
    }

    fn flush(&mut self, cut: usize) -> Result<Vec<Block>, EngineError> {
        let mut blocks = (self.parse)(&self.buffer[..cut])?;
        for block in &mut blocks {
            block.shift(self.consumed);
        }
        log::trace!(
            "stream flush of {cut} bytes at {} gave {} blocks",
            self.consumed,
            blocks.len()
        );
        self.buffer.drain(..cut);
        self.consumed += cut;
        Ok(blocks)
    }
}

/// Runs a whole text through a [`StreamingParser`] in `window`-sized pieces.
pub fn parse_streaming<P>(text: &str, window: usize, parse: P) -> Result<Vec<Block>, EngineError>
where
    P: Fn(&str) -> Result<Vec<Block>, EngineError>,
{
    let mut stream = StreamingParser::new(parse);
    let mut blocks = Vec::new();
    for piece in windows(text, window) {
        blocks.extend(stream.push(piece)?);
    }
    blocks.extend(stream.finish()?);
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{ConvertOptions, parse_blocks};
    use pretty_assertions::assert_eq;

    fn simplified(text: &str) -> Result<Vec<Block>, EngineError> {
        parse_blocks(text, &ConvertOptions::simplified())
    }

    #[test]
    fn ranges_are_document_absolute() {
        let text = "para one\n\npara two\n\npara three\n";
        let mut stream = StreamingParser::new(simplified).with_flush_threshold(12);
        let mut blocks = stream.push(&text[..15]).unwrap();
        blocks.extend(stream.push(&text[15..]).unwrap());
        blocks.extend(stream.finish().unwrap());

        assert_eq!(blocks.len(), 3);
        for block in &blocks {
            let r = block.source_range;
            assert_eq!(
                text[r.start..r.end].trim(),
                block.content.text().unwrap()
            );
        }
    }

    #[test]
    fn nothing_is_emitted_below_threshold() {
        let mut stream = StreamingParser::new(simplified);
        assert!(stream.push("# small\n").unwrap().is_empty());
        assert_eq!(stream.finish().unwrap().len(), 1);
    }

    #[test]
    fn flushes_on_blank_lines_match_a_whole_parse() {
        let text = "# a\n\nbody\n\n- x\n- y\n\n```\ncode\n```\n".repeat(20);
        let mut stream = StreamingParser::new(simplified).with_flush_threshold(64);
        let mut streamed = Vec::new();
        for piece in windows(&text, 16) {
            streamed.extend(stream.push(piece).unwrap());
        }
        streamed.extend(stream.finish().unwrap());

        let whole = simplified(&text).unwrap();
        let types = |blocks: &[Block]| blocks.iter().map(Block::block_type).collect::<Vec<_>>();
        assert_eq!(types(&streamed), types(&whole));
    }

    #[test]
    fn parse_streaming_covers_the_whole_text() {
        let text = "one\n\ntwo\n\nthree\n";
        let blocks = parse_streaming(text, 4, simplified).unwrap();
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn errors_propagate() {
        let failing = |_: &str| -> Result<Vec<Block>, EngineError> { Err(EngineError::parse("nope")) };
        assert!(parse_streaming("text", 2, failing).is_err());
    }
}
