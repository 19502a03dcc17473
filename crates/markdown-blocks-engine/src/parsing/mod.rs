pub mod adapter;
pub mod convert;
pub mod kinds;
pub mod lines;
pub mod syntax;

#[cfg(test)]
mod tests;

use crate::blocks::Block;
use crate::error::EngineError;

pub use adapter::{ParserExtensions, parse_syntax};
pub use convert::{BlockConverter, ConvertMode, ConvertOptions};
pub use syntax::{NodeKind, SyntaxNode};

/// Parses `text` into unassigned blocks (empty IDs) with ranges relative to
/// the start of `text`.
pub fn parse_blocks(text: &str, options: &ConvertOptions) -> Result<Vec<Block>, EngineError> {
    let root = parse_syntax(text, &options.extensions)?;
    Ok(BlockConverter::new(text, options).convert_document(&root))
}
