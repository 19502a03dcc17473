//! Structural checks on input text and on block trees.
//!
//! Failures here are final: nothing on the output side is retried.

use std::collections::HashSet;

use crate::blocks::{Block, BlockContent};
use crate::error::EngineError;
use crate::parsing::convert::MAX_HEADING_LEVEL;

/// Input ceiling, 50 MiB.
pub const MAX_INPUT_BYTES: usize = 50 * 1024 * 1024;

pub fn validate_input(text: &str) -> Result<(), EngineError> {
    if text.len() > MAX_INPUT_BYTES {
        return Err(EngineError::invalid_input(format!(
            "input is {} bytes, limit is {MAX_INPUT_BYTES}",
            text.len()
        )));
    }
    Ok(())
}

/// Checks that `bytes` is UTF-8 text under the size ceiling.
pub fn validate_input_bytes(bytes: &[u8]) -> Result<&str, EngineError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        EngineError::invalid_input(format!("input is not UTF-8 text: {e}"))
    })?;
    validate_input(text)?;
    Ok(text)
}

/// Checks every block of a tree. Errors carry the index of the top-level
/// block the problem was found under.
pub fn validate_blocks(blocks: &[Block]) -> Result<(), EngineError> {
    let mut seen = HashSet::new();
    for (index, block) in blocks.iter().enumerate() {
        validate_block(block, &mut seen).map_err(|reason| EngineError::validation(index, reason))?;
    }
    Ok(())
}

fn validate_block<'a>(block: &'a Block, seen: &mut HashSet<&'a str>) -> Result<(), String> {
    let ty = block.block_type();
    if block.id.is_empty() {
        return Err(format!("{ty} block has an empty id"));
    }
    if !seen.insert(block.id.as_str()) {
        return Err(format!("duplicate id {}", block.id));
    }

    let range = block.source_range;
    if range.start > range.end {
        return Err(format!("{} has an inverted source range {range}", block.id));
    }
    if !block.children.is_empty() && !ty.is_container() {
        return Err(format!("{} is a {ty} and cannot have children", block.id));
    }
    if let BlockContent::Table {
        headers,
        alignments,
        ..
    } = &block.content
        && !alignments.is_empty()
        && alignments.len() != headers.len()
    {
        return Err(format!(
            "{} has {} alignments for {} columns",
            block.id,
            alignments.len(),
            headers.len()
        ));
    }
    if let BlockContent::Heading { level, .. } = block.content
        && !(1..=MAX_HEADING_LEVEL).contains(&level)
    {
        return Err(format!("{} has heading level {level}", block.id));
    }

    for child in &block.children {
        if !range.contains(child.source_range) {
            return Err(format!(
                "child {} range {} is outside parent {} range {range}",
                child.id, child.source_range, block.id
            ));
        }
        validate_block(child, seen)?;
    }
    Ok(())
}
