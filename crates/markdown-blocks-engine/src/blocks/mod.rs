//! # Block Data Model
//!
//! A [`Block`] is the unit of structured content the visual editor renders:
//! a stable `id`, a typed [`BlockContent`], the [`SourceRange`] it was
//! derived from, and (for containers) ordered children.
//!
//! Trees are immutable snapshots. A parse produces a fresh [`BlockTree`];
//! continuity of identity across parses is supplied by
//! [`crate::identity::IdAssigner`], never by mutating an old tree.
//!
//! ## Invariants
//!
//! - `0 <= source_range.start <= source_range.end`
//! - A child's range is contained in its parent's range
//! - A table's alignment vector, when non-empty, has one entry per header cell
//! - A task item's `checked` is always a concrete boolean

pub mod range;

use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use range::SourceRange;

/// The closed set of block types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockType {
    Paragraph,
    Heading,
    List,
    ListItem,
    TaskList,
    TaskItem,
    Quote,
    Code,
    Divider,
    Table,
    Image,
    Link,
    Callout,
    Toggle,
}

impl BlockType {
    pub const ALL: [BlockType; 14] = [
        BlockType::Paragraph,
        BlockType::Heading,
        BlockType::List,
        BlockType::ListItem,
        BlockType::TaskList,
        BlockType::TaskItem,
        BlockType::Quote,
        BlockType::Code,
        BlockType::Divider,
        BlockType::Table,
        BlockType::Image,
        BlockType::Link,
        BlockType::Callout,
        BlockType::Toggle,
    ];

    /// The wire name (`"listItem"`, `"taskList"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading => "heading",
            BlockType::List => "list",
            BlockType::ListItem => "listItem",
            BlockType::TaskList => "taskList",
            BlockType::TaskItem => "taskItem",
            BlockType::Quote => "quote",
            BlockType::Code => "code",
            BlockType::Divider => "divider",
            BlockType::Table => "table",
            BlockType::Image => "image",
            BlockType::Link => "link",
            BlockType::Callout => "callout",
            BlockType::Toggle => "toggle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Types that may carry children.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            BlockType::List
                | BlockType::ListItem
                | BlockType::TaskList
                | BlockType::TaskItem
                | BlockType::Toggle
        )
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column alignment in a table separator row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Semantic category of a callout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalloutKind {
    Note,
    Tip,
    Warning,
    Danger,
    Info,
}

/// Typed payload of a block; the variant determines the block's type.
///
/// Text fields hold inline Markdown (emphasis, links and code spans are kept
/// as written), so the serializer can emit them verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "camelCase")]
pub enum BlockContent {
    Paragraph {
        text: String,
    },
    Heading {
        level: u8,
        text: String,
    },
    List {
        ordered: bool,
        start: u64,
    },
    ListItem {
        text: String,
    },
    TaskList {},
    TaskItem {
        checked: bool,
        text: String,
    },
    Quote {
        text: String,
    },
    Code {
        language: Option<String>,
        code: String,
    },
    Divider {},
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        alignments: Vec<Option<Alignment>>,
    },
    Image {
        src: String,
        alt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
    },
    Link {
        href: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Callout {
        kind: CalloutKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        body: String,
    },
    Toggle {
        summary: String,
        #[serde(default)]
        open: bool,
    },
}

impl BlockContent {
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockContent::Paragraph { .. } => BlockType::Paragraph,
            BlockContent::Heading { .. } => BlockType::Heading,
            BlockContent::List { .. } => BlockType::List,
            BlockContent::ListItem { .. } => BlockType::ListItem,
            BlockContent::TaskList {} => BlockType::TaskList,
            BlockContent::TaskItem { .. } => BlockType::TaskItem,
            BlockContent::Quote { .. } => BlockType::Quote,
            BlockContent::Code { .. } => BlockType::Code,
            BlockContent::Divider {} => BlockType::Divider,
            BlockContent::Table { .. } => BlockType::Table,
            BlockContent::Image { .. } => BlockType::Image,
            BlockContent::Link { .. } => BlockType::Link,
            BlockContent::Callout { .. } => BlockType::Callout,
            BlockContent::Toggle { .. } => BlockType::Toggle,
        }
    }

    /// The primary text of the block, if it has one.
    pub fn text(&self) -> Option<&str> {
        match self {
            BlockContent::Paragraph { text }
            | BlockContent::Heading { text, .. }
            | BlockContent::ListItem { text }
            | BlockContent::TaskItem { text, .. }
            | BlockContent::Quote { text }
            | BlockContent::Link { text, .. } => Some(text),
            BlockContent::Code { code, .. } => Some(code),
            BlockContent::Callout { body, .. } => Some(body),
            BlockContent::Toggle { summary, .. } => Some(summary),
            BlockContent::Image { alt, .. } => Some(alt),
            BlockContent::List { .. }
            | BlockContent::TaskList {}
            | BlockContent::Divider {}
            | BlockContent::Table { .. } => None,
        }
    }
}

/// One node of the block tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Unique within one assigned tree; empty until IDs are assigned.
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub content: BlockContent,
    pub source_range: SourceRange,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    /// A block without an ID or children.
    pub fn new(content: BlockContent, source_range: SourceRange) -> Self {
        Self {
            id: String::new(),
            content,
            source_range,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    pub fn block_type(&self) -> BlockType {
        self.content.block_type()
    }

    /// Moves this block and all descendants right by `offset` bytes.
    pub fn shift(&mut self, offset: usize) {
        self.source_range = self.source_range.shifted(offset);
        for child in &mut self.children {
            child.shift(offset);
        }
    }

    /// Pre-order traversal of this block and its descendants.
    pub fn walk(&self) -> impl Iterator<Item = &Block> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    /// Number of blocks in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Block::subtree_len).sum::<usize>()
    }
}

/// An immutable snapshot of a parsed document.
///
/// Cloning is cheap; the cache and callers share the same allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockTree(Arc<[Block]>);

impl BlockTree {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self(blocks.into())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.0
    }

    /// Pre-order traversal across all top-level blocks.
    pub fn walk(&self) -> impl Iterator<Item = &Block> {
        self.0.iter().flat_map(Block::walk)
    }

    pub fn to_vec(&self) -> Vec<Block> {
        self.0.to_vec()
    }

    /// Whether both snapshots share one allocation.
    pub fn ptr_eq(&self, other: &BlockTree) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for BlockTree {
    type Target = [Block];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Block>> for BlockTree {
    fn from(blocks: Vec<Block>) -> Self {
        Self::new(blocks)
    }
}

impl Serialize for BlockTree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn para(text: &str, start: usize, end: usize) -> Block {
        Block::new(
            BlockContent::Paragraph { text: text.into() },
            SourceRange::new(start, end),
        )
    }

    #[test]
    fn block_type_follows_content_variant() {
        assert_eq!(para("x", 0, 1).block_type(), BlockType::Paragraph);
        let divider = Block::new(BlockContent::Divider {}, SourceRange::new(0, 3));
        assert_eq!(divider.block_type(), BlockType::Divider);
    }

    #[test]
    fn wire_names_round_trip() {
        for t in BlockType::ALL {
            assert_eq!(BlockType::from_name(t.as_str()), Some(t));
        }
        assert_eq!(BlockType::from_name("mermaid"), None);
    }

    #[test]
    fn json_shape_is_type_plus_content() {
        let mut block = para("hello", 0, 5);
        block.id = "paragraph-1".into();
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "paragraph");
        assert_eq!(json["content"]["text"], "hello");
        assert_eq!(json["sourceRange"]["start"], 0);
        assert_eq!(json["sourceRange"]["end"], 5);
        assert!(json.get("children").is_none());

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn divider_serializes_with_empty_content() {
        let block = Block::new(BlockContent::Divider {}, SourceRange::new(0, 3));
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "divider");
        assert_eq!(json["content"], serde_json::json!({}));
    }

    #[test]
    fn table_alignments_serialize_as_nullable_strings() {
        let content = BlockContent::Table {
            headers: vec!["a".into(), "b".into(), "c".into()],
            rows: vec![],
            alignments: vec![Some(Alignment::Left), Some(Alignment::Center), None],
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(
            json["content"]["alignments"],
            serde_json::json!(["left", "center", null])
        );
    }

    #[test]
    fn walk_is_pre_order_and_shift_is_recursive() {
        let mut list = Block::new(
            BlockContent::List {
                ordered: false,
                start: 1,
            },
            SourceRange::new(0, 10),
        )
        .with_children(vec![
            Block::new(BlockContent::ListItem { text: "a".into() }, SourceRange::new(0, 4)),
            Block::new(BlockContent::ListItem { text: "b".into() }, SourceRange::new(5, 10)),
        ]);
        let order: Vec<_> = list.walk().map(Block::block_type).collect();
        assert_eq!(
            order,
            vec![BlockType::List, BlockType::ListItem, BlockType::ListItem]
        );
        assert_eq!(list.subtree_len(), 3);

        list.shift(100);
        assert_eq!(list.source_range, SourceRange::new(100, 110));
        assert_eq!(list.children[1].source_range, SourceRange::new(105, 110));
    }

    #[test]
    fn tree_clones_share_storage() {
        let tree = BlockTree::new(vec![para("x", 0, 1)]);
        let copy = tree.clone();
        assert!(tree.ptr_eq(&copy));
        assert_eq!(copy.len(), 1);
    }
}
