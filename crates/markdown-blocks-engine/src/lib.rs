pub mod blocks;
pub mod editor;
pub mod engine;
pub mod error;
pub mod identity;
pub mod parsing;
pub mod performance;
pub mod recovery;
pub mod serialize;
pub mod validation;

// Re-export key types for easier usage
pub use blocks::{Alignment, Block, BlockContent, BlockTree, BlockType, CalloutKind, SourceRange};
pub use editor::{EditorNode, EditorOptions, editor_to_markdown, markdown_to_editor};
pub use engine::{Analysis, EngineOptions, MarkdownEngine, SafeOutcome};
pub use error::{ConvertError, EngineError};
pub use identity::IdAssigner;
pub use parsing::kinds::{CalloutStyle, ToggleReassembly};
pub use parsing::{ConvertMode, ConvertOptions, ParserExtensions};
pub use performance::{CacheOptions, ComplexityScore, ParseMetrics, Strategy, StrategyThresholds};
pub use recovery::{RecoveryOptions, fix_common_issues};
pub use serialize::{Serializer, SerializerSettings};
pub use validation::MAX_INPUT_BYTES;
