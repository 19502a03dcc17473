use crate::blocks::{Alignment, SourceRange};

/// Node kinds of the Markdown abstract syntax produced by the adapter.
///
/// Block-level and inline kinds share one enum so a single tree can be
/// handed to both the block converter and the editor converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading {
        level: u8,
    },
    BlockQuote,
    /// `start` is `Some` for ordered lists.
    List {
        start: Option<u64>,
    },
    Item {
        checked: Option<bool>,
    },
    /// `info` is `None` for indented code.
    CodeBlock {
        info: Option<String>,
    },
    Rule,
    /// Block-level raw markup; the raw text is in [`SyntaxNode::text`].
    Html,
    Table {
        alignments: Vec<Option<Alignment>>,
    },
    TableHead,
    TableRow,
    TableCell,
    MetadataBlock,
    FootnoteDefinition,

    Text,
    Code,
    InlineHtml,
    SoftBreak,
    HardBreak,
    Emphasis,
    Strong,
    Strikethrough,
    Link {
        url: String,
        title: String,
        autolink: bool,
    },
    Image {
        url: String,
        title: String,
    },
    Math,
    FootnoteReference,
    /// Anything the engine has no use for, named for logging.
    Other(&'static str),
}

impl NodeKind {
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Text
                | NodeKind::Code
                | NodeKind::InlineHtml
                | NodeKind::SoftBreak
                | NodeKind::HardBreak
                | NodeKind::Emphasis
                | NodeKind::Strong
                | NodeKind::Strikethrough
                | NodeKind::Link { .. }
                | NodeKind::Image { .. }
                | NodeKind::Math
                | NodeKind::FootnoteReference
        )
    }

    /// Short name for log messages.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading { .. } => "heading",
            NodeKind::BlockQuote => "blockquote",
            NodeKind::List { .. } => "list",
            NodeKind::Item { .. } => "item",
            NodeKind::CodeBlock { .. } => "code block",
            NodeKind::Rule => "thematic break",
            NodeKind::Html => "html",
            NodeKind::Table { .. } => "table",
            NodeKind::TableHead => "table head",
            NodeKind::TableRow => "table row",
            NodeKind::TableCell => "table cell",
            NodeKind::MetadataBlock => "front matter",
            NodeKind::FootnoteDefinition => "footnote definition",
            NodeKind::Text => "text",
            NodeKind::Code => "code span",
            NodeKind::InlineHtml => "inline html",
            NodeKind::SoftBreak => "soft break",
            NodeKind::HardBreak => "hard break",
            NodeKind::Emphasis => "emphasis",
            NodeKind::Strong => "strong",
            NodeKind::Strikethrough => "strikethrough",
            NodeKind::Link { .. } => "link",
            NodeKind::Image { .. } => "image",
            NodeKind::Math => "math",
            NodeKind::FootnoteReference => "footnote reference",
            NodeKind::Other(name) => name,
        }
    }
}

/// One node of the syntax tree, with its byte range in the parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub range: SourceRange,
    /// Literal content of leaves (unescaped text, code span body, raw HTML).
    pub text: Option<String>,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, range: SourceRange) -> Self {
        Self {
            kind,
            range,
            text: None,
            children: Vec::new(),
        }
    }

    pub fn leaf(kind: NodeKind, range: SourceRange, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(kind, range)
        }
    }

    /// Unescaped text content; breaks become spaces.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_plain(self, &mut out);
        out
    }

    /// The node's inline content as Markdown, container prefixes removed.
    pub fn inline_markdown(&self, source: &str) -> String {
        render_inlines(&self.children, source)
    }
}

fn collect_plain(node: &SyntaxNode, out: &mut String) {
    match node.kind {
        NodeKind::SoftBreak | NodeKind::HardBreak => out.push(' '),
        _ => {
            if let Some(text) = &node.text {
                out.push_str(text);
            }
            for child in &node.children {
                collect_plain(child, out);
            }
        }
    }
}

/// Renders a run of inline nodes back to Markdown.
///
/// Leaves are copied verbatim from `source`, so escapes and entities survive.
/// Gaps between siblings on the same line are kept; anything after a line
/// break up to the next node (blockquote markers, list indentation) is not,
/// and neither is trailing whitespace before a break.
pub fn render_inlines(nodes: &[SyntaxNode], source: &str) -> String {
    let mut out = String::new();
    render_run(nodes, source, &mut out);
    out
}

fn render_run(nodes: &[SyntaxNode], source: &str, out: &mut String) {
    let mut prev: Option<&SyntaxNode> = None;
    for node in nodes {
        if let Some(p) = prev
            && !matches!(p.kind, NodeKind::SoftBreak | NodeKind::HardBreak)
            && !matches!(node.kind, NodeKind::SoftBreak | NodeKind::HardBreak)
            && let Some(gap) = source.get(p.range.end..node.range.start)
            && !gap.contains('\n')
        {
            out.push_str(gap);
        }
        render_node(node, source, out);
        prev = Some(node);
    }
}

fn render_node(node: &SyntaxNode, source: &str, out: &mut String) {
    let slice = source.get(node.range.start..node.range.end);
    match node.kind {
        NodeKind::SoftBreak => out.push('\n'),
        NodeKind::HardBreak => {
            let marker = slice.map_or("", |s| s.trim_end_matches(['\r', '\n']));
            if marker.starts_with('\\') {
                out.push_str("\\\n");
            } else {
                out.push_str("  \n");
            }
        }
        _ if node.children.is_empty() => match slice {
            Some(s) => out.push_str(s),
            None => out.push_str(node.text.as_deref().unwrap_or_default()),
        },
        _ => {
            let first = &node.children[0];
            let last = &node.children[node.children.len() - 1];
            if let Some(open) = source.get(node.range.start..first.range.start) {
                out.push_str(open);
            }
            render_run(&node.children, source, out);
            if let Some(close) = source.get(last.range.end..node.range.end) {
                out.push_str(close);
            }
        }
    }
}
