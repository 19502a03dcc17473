//! Conversion between Markdown and the visual editor's own document tree.
//!
//! This path is separate from the block API but reads the same syntax tree
//! and shares its recognizers: headings clamp the same way, callouts and
//! toggles are detected by the same code, and output goes through the block
//! serializer.

pub mod from_markdown;
pub mod node;
pub mod to_markdown;

pub use from_markdown::{EditorOptions, markdown_to_editor};
pub use node::{EditorNode, Mark, MarkType, NodeType};
pub use to_markdown::{editor_to_markdown, inline_markdown};
