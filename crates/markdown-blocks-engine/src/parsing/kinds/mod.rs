//! Syntax knowledge per construct: each module owns the delimiters and
//! recognisers for one kind of block, shared by the converter, the
//! serializer, the recovery layer and the editor converter.

pub mod block_quote;
pub mod callout;
pub mod code_fence;
pub mod image;
pub mod toggle;

pub use block_quote::BlockQuote;
pub use callout::{CalloutHeader, CalloutStyle};
pub use code_fence::{CodeFence, FenceKind};
pub use toggle::{Fragment, ToggleMarkup, ToggleReassembly, ToggleSibling};
