//! Structural parser adapter over `pulldown-cmark`.
//!
//! Folds the offset-annotated event stream into an owned [`SyntaxNode`] tree.
//! Extensions are switched per size tier through [`ParserExtensions`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use pulldown_cmark::{
    Alignment as CmarkAlignment, CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser,
    Tag,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::blocks::{Alignment, SourceRange};
use crate::error::EngineError;

use super::syntax::{NodeKind, SyntaxNode};

static BARE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s<>]+$").unwrap());

/// Parser extensions; costly ones are dropped for large documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserExtensions {
    pub tables: bool,
    pub task_lists: bool,
    pub strikethrough: bool,
    /// Bare `http(s)://` paragraphs become link blocks.
    pub autolinks: bool,
    /// YAML front matter is recognised (and skipped) instead of being read
    /// as a rule plus a setext heading.
    pub front_matter: bool,
}

impl ParserExtensions {
    pub fn full() -> Self {
        Self {
            tables: true,
            task_lists: true,
            strikethrough: true,
            autolinks: true,
            front_matter: true,
        }
    }

    /// What the simplified and streaming tiers run with.
    pub fn minimal() -> Self {
        Self {
            tables: false,
            task_lists: true,
            strikethrough: true,
            autolinks: false,
            front_matter: false,
        }
    }

    fn options(&self) -> Options {
        let mut options = Options::empty();
        options.set(Options::ENABLE_TABLES, self.tables);
        options.set(Options::ENABLE_TASKLISTS, self.task_lists);
        options.set(Options::ENABLE_STRIKETHROUGH, self.strikethrough);
        options.set(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS, self.front_matter);
        options
    }

    /// Whether `text` is a bare URL the autolink extension should promote.
    pub fn is_bare_url(&self, text: &str) -> bool {
        self.autolinks && BARE_URL_RE.is_match(text)
    }
}

impl Default for ParserExtensions {
    fn default() -> Self {
        Self::full()
    }
}

/// Parses `text` into a syntax tree rooted at a `Document` node.
///
/// A panic inside the parser is reported as a parse error instead of
/// unwinding into the caller.
pub fn parse_syntax(text: &str, extensions: &ParserExtensions) -> Result<SyntaxNode, EngineError> {
    panic::catch_unwind(AssertUnwindSafe(|| build_tree(text, extensions))).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "parser panicked".to_string());
        log::warn!("markdown parser panicked: {message}");
        EngineError::parse(message)
    })
}

fn build_tree(text: &str, extensions: &ParserExtensions) -> SyntaxNode {
    let root = SyntaxNode::new(NodeKind::Document, SourceRange::new(0, text.len()));
    let mut stack: Vec<SyntaxNode> = vec![root];

    for (event, range) in Parser::new_ext(text, extensions.options()).into_offset_iter() {
        let range = SourceRange::from(range);
        match event {
            Event::Start(tag) => stack.push(SyntaxNode::new(kind_for_tag(tag), range)),
            Event::End(_) => close_top(&mut stack),
            Event::Text(t) => push_leaf(&mut stack, NodeKind::Text, range, &t),
            Event::Code(t) => push_leaf(&mut stack, NodeKind::Code, range, &t),
            Event::InlineMath(t) | Event::DisplayMath(t) => {
                push_leaf(&mut stack, NodeKind::Math, range, &t)
            }
            Event::Html(t) => match stack.last_mut() {
                Some(top) if top.kind == NodeKind::Html => {
                    top.text.get_or_insert_with(String::new).push_str(&t);
                }
                _ => push_leaf(&mut stack, NodeKind::Html, range, &t),
            },
            Event::InlineHtml(t) => push_leaf(&mut stack, NodeKind::InlineHtml, range, &t),
            Event::FootnoteReference(t) => {
                push_leaf(&mut stack, NodeKind::FootnoteReference, range, &t)
            }
            Event::SoftBreak => push_leaf(&mut stack, NodeKind::SoftBreak, range, "\n"),
            Event::HardBreak => push_leaf(&mut stack, NodeKind::HardBreak, range, "\n"),
            Event::Rule => push_leaf(&mut stack, NodeKind::Rule, range, ""),
            Event::TaskListMarker(checked) => {
                if let Some(item) = stack
                    .iter_mut()
                    .rev()
                    .find(|n| matches!(n.kind, NodeKind::Item { .. }))
                {
                    item.kind = NodeKind::Item {
                        checked: Some(checked),
                    };
                }
            }
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().unwrap_or_else(|| {
        SyntaxNode::new(NodeKind::Document, SourceRange::new(0, text.len()))
    })
}

fn close_top(stack: &mut Vec<SyntaxNode>) {
    if stack.len() > 1
        && let Some(node) = stack.pop()
        && let Some(parent) = stack.last_mut()
    {
        parent.children.push(node);
    }
}

fn push_leaf(stack: &mut [SyntaxNode], kind: NodeKind, range: SourceRange, text: &str) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(SyntaxNode::leaf(kind, range, text));
    }
}

fn kind_for_tag(tag: Tag<'_>) -> NodeKind {
    match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, .. } => NodeKind::Heading {
            level: heading_level(level),
        },
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => NodeKind::CodeBlock {
            info: Some(info.to_string()),
        },
        Tag::CodeBlock(CodeBlockKind::Indented) => NodeKind::CodeBlock { info: None },
        Tag::HtmlBlock => NodeKind::Html,
        Tag::List(start) => NodeKind::List { start },
        Tag::Item => NodeKind::Item { checked: None },
        Tag::FootnoteDefinition(_) => NodeKind::FootnoteDefinition,
        Tag::Table(alignments) => NodeKind::Table {
            alignments: alignments.into_iter().map(alignment).collect(),
        },
        Tag::TableHead => NodeKind::TableHead,
        Tag::TableRow => NodeKind::TableRow,
        Tag::TableCell => NodeKind::TableCell,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Link {
            link_type,
            dest_url,
            title,
            ..
        } => NodeKind::Link {
            url: dest_url.to_string(),
            title: title.to_string(),
            autolink: matches!(link_type, LinkType::Autolink | LinkType::Email),
        },
        Tag::Image {
            dest_url, title, ..
        } => NodeKind::Image {
            url: dest_url.to_string(),
            title: title.to_string(),
        },
        Tag::MetadataBlock(_) => NodeKind::MetadataBlock,
        _ => NodeKind::Other("extension"),
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn alignment(a: CmarkAlignment) -> Option<Alignment> {
    match a {
        CmarkAlignment::None => None,
        CmarkAlignment::Left => Some(Alignment::Left),
        CmarkAlignment::Center => Some(Alignment::Center),
        CmarkAlignment::Right => Some(Alignment::Right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(node: &SyntaxNode) -> Vec<&'static str> {
        node.children.iter().map(|c| c.kind.name()).collect()
    }

    #[test]
    fn empty_input_is_an_empty_document() {
        let root = parse_syntax("", &ParserExtensions::full()).unwrap();
        assert_eq!(root.kind, NodeKind::Document);
        assert!(root.children.is_empty());
    }

    #[test]
    fn block_ranges_are_byte_offsets() {
        let text = "# Title\n\nBody text\n";
        let root = parse_syntax(text, &ParserExtensions::full()).unwrap();
        assert_eq!(kinds(&root), vec!["heading", "paragraph"]);
        let para = &root.children[1];
        assert_eq!(&text[para.range.start..para.range.end].trim_end(), &"Body text");
    }

    #[test]
    fn task_markers_land_on_items() {
        let root = parse_syntax("- [x] done\n- [ ] todo\n- plain", &ParserExtensions::full())
            .unwrap();
        let list = &root.children[0];
        let checked: Vec<_> = list
            .children
            .iter()
            .map(|item| match item.kind {
                NodeKind::Item { checked } => checked,
                _ => panic!("expected item"),
            })
            .collect();
        assert_eq!(checked, vec![Some(true), Some(false), None]);
    }

    #[test]
    fn tables_depend_on_extension() {
        let text = "| a | b |\n|:--|--:|\n| 1 | 2 |";
        let with = parse_syntax(text, &ParserExtensions::full()).unwrap();
        match &with.children[0].kind {
            NodeKind::Table { alignments } => {
                assert_eq!(alignments, &vec![Some(Alignment::Left), Some(Alignment::Right)])
            }
            other => panic!("expected table, got {other:?}"),
        }

        let without = parse_syntax(text, &ParserExtensions::minimal()).unwrap();
        assert_eq!(kinds(&without), vec!["paragraph"]);
    }

    #[test]
    fn html_block_collects_raw_text() {
        let text = "<details>\n<summary>S</summary>\n\nbody\n";
        let root = parse_syntax(text, &ParserExtensions::full()).unwrap();
        assert_eq!(kinds(&root), vec!["html", "paragraph"]);
        assert_eq!(
            root.children[0].text.as_deref(),
            Some("<details>\n<summary>S</summary>\n")
        );
    }

    #[test]
    fn front_matter_depends_on_extension() {
        let text = "---\ntitle: x\n---\n\nBody";
        let with = parse_syntax(text, &ParserExtensions::full()).unwrap();
        assert_eq!(kinds(&with), vec!["front matter", "paragraph"]);
    }

    #[test]
    fn bare_urls_only_count_with_autolinks() {
        assert!(ParserExtensions::full().is_bare_url("https://example.com/a?b=c"));
        assert!(!ParserExtensions::full().is_bare_url("see https://example.com"));
        assert!(!ParserExtensions::minimal().is_bare_url("https://example.com"));
    }
}
