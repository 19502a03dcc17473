use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::blocks::SourceRange;
use crate::parsing::kinds::ToggleSibling;

pub const SOURCE_START: &str = "sourceStart";
pub const SOURCE_END: &str = "sourceEnd";

/// Node types of the editor's document schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    TaskList,
    TaskItem,
    Blockquote,
    Callout,
    CodeBlock,
    HorizontalRule,
    Table,
    TableRow,
    TableHeader,
    TableCell,
    Image,
    Details,
    Text,
    HardBreak,
    /// Anything this engine does not know; skipped on the way back.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkType {
    Bold,
    Italic,
    Strike,
    Code,
    Link,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: MarkType,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
}

impl Mark {
    pub fn new(mark_type: MarkType) -> Self {
        Self {
            mark_type,
            attrs: Map::new(),
        }
    }

    pub fn link(href: &str, title: Option<&str>) -> Self {
        let mut mark = Self::new(MarkType::Link);
        mark.attrs.insert("href".into(), href.into());
        if let Some(title) = title {
            mark.attrs.insert("title".into(), title.into());
        }
        mark
    }
}

/// A node of the editor's document tree, in the JSON shape the editor
/// exchanges (`type`, `attrs`, `content`, `text`, `marks`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorNode {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<EditorNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl EditorNode {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            attrs: Map::new(),
            content: Vec::new(),
            text: None,
            marks: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            text: Some(text.into()),
            marks,
            ..Self::new(NodeType::Text)
        }
    }

    #[must_use]
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: Vec<EditorNode>) -> Self {
        self.content = content;
        self
    }

    /// Records where this node came from.
    #[must_use]
    pub fn at(self, range: SourceRange) -> Self {
        self.with_attr(SOURCE_START, range.start)
            .with_attr(SOURCE_END, range.end)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn attr_u64(&self, key: &str) -> Option<u64> {
        self.attrs.get(key).and_then(Value::as_u64)
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attrs.get(key).and_then(Value::as_bool)
    }

    pub fn source_range(&self) -> Option<SourceRange> {
        let start = self.attr_u64(SOURCE_START)?;
        let end = self.attr_u64(SOURCE_END)?;
        Some(SourceRange::new(start as usize, end as usize))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn plain_text(&self) -> String {
        let mut out = self.text.clone().unwrap_or_default();
        for child in &self.content {
            out.push_str(&child.plain_text());
        }
        out
    }

    fn set_end(&mut self, end: usize) {
        if self.attr_u64(SOURCE_END).is_some_and(|e| e as usize >= end) {
            return;
        }
        self.attrs.insert(SOURCE_END.into(), end.into());
    }
}

impl ToggleSibling for EditorNode {
    fn is_toggle(&self) -> bool {
        self.node_type == NodeType::Details
    }

    fn absorb(&mut self, child: Self) {
        if let Some(range) = child.source_range() {
            self.set_end(range.end);
        }
        self.content.push(child);
    }

    fn extend_to(&mut self, end: usize) {
        self.set_end(end);
    }
}
