use crate::blocks::{Alignment, Block, BlockContent, CalloutKind};
use crate::error::EngineError;
use crate::parsing::convert::MAX_HEADING_LEVEL;
use crate::serialize::{Serializer, SerializerSettings};

use super::node::{EditorNode, Mark, MarkType, NodeType};

/// Writes an editor document back to Markdown.
///
/// The document is mapped onto blocks and rendered by the block
/// [`Serializer`], so both paths share one output format. Unknown node types
/// are skipped.
pub fn editor_to_markdown(
    doc: &EditorNode,
    settings: &dyn SerializerSettings,
) -> Result<String, EngineError> {
    if doc.node_type != NodeType::Doc {
        return Err(EngineError::invalid_input(format!(
            "expected a doc node, got {:?}",
            doc.node_type
        )));
    }
    let blocks = blocks_of(&doc.content, settings);
    Ok(Serializer::new(settings).render(&blocks))
}

fn blocks_of(nodes: &[EditorNode], settings: &dyn SerializerSettings) -> Vec<Block> {
    nodes
        .iter()
        .filter_map(|node| block_of(node, settings))
        .collect()
}

fn block_of(node: &EditorNode, settings: &dyn SerializerSettings) -> Option<Block> {
    let range = node.source_range().unwrap_or_default();
    let block = |content: BlockContent| Some(Block::new(content, range));

    match node.node_type {
        NodeType::Paragraph => block(BlockContent::Paragraph {
            text: inline_markdown(&node.content),
        }),
        NodeType::Heading => {
            let level = node
                .attr_u64("level")
                .map_or(1, |l| l.clamp(1, u64::from(MAX_HEADING_LEVEL)) as u8);
            block(BlockContent::Heading {
                level,
                text: inline_markdown(&node.content),
            })
        }
        NodeType::BulletList | NodeType::OrderedList | NodeType::TaskList => {
            Some(list(node, settings))
        }
        NodeType::Blockquote => block(BlockContent::Quote {
            text: nested_markdown(&node.content, settings),
        }),
        NodeType::Callout => {
            let kind = node
                .attr_str("kind")
                .map_or(CalloutKind::Note, CalloutKind::from_marker);
            block(BlockContent::Callout {
                kind,
                title: node.attr_str("title").map(str::to_string),
                body: nested_markdown(&node.content, settings),
            })
        }
        NodeType::CodeBlock => block(BlockContent::Code {
            language: node.attr_str("language").map(str::to_string),
            code: node.plain_text(),
        }),
        NodeType::HorizontalRule => block(BlockContent::Divider {}),
        NodeType::Table => block(table(node)),
        NodeType::Image => block(BlockContent::Image {
            src: node.attr_str("src").unwrap_or_default().to_string(),
            alt: node.attr_str("alt").unwrap_or_default().to_string(),
            title: node.attr_str("title").map(str::to_string),
            width: node.attr_u64("width").and_then(|w| u32::try_from(w).ok()),
            height: node.attr_u64("height").and_then(|h| u32::try_from(h).ok()),
        }),
        NodeType::Details => Some(
            Block::new(
                BlockContent::Toggle {
                    summary: node.attr_str("summary").unwrap_or_default().to_string(),
                    open: node.attr_bool("open").unwrap_or(false),
                },
                range,
            )
            .with_children(blocks_of(&node.content, settings)),
        ),
        // stray inline content at block level
        NodeType::Text | NodeType::HardBreak => block(BlockContent::Paragraph {
            text: inline_markdown(std::slice::from_ref(node)),
        }),
        other => {
            log::warn!("skipping editor node of type {other:?}");
            None
        }
    }
}

fn list(node: &EditorNode, settings: &dyn SerializerSettings) -> Block {
    let range = node.source_range().unwrap_or_default();
    let content = match node.node_type {
        NodeType::TaskList => BlockContent::TaskList {},
        NodeType::OrderedList => BlockContent::List {
            ordered: true,
            start: node.attr_u64("start").unwrap_or(1),
        },
        _ => BlockContent::List {
            ordered: false,
            start: 1,
        },
    };

    let items = node
        .content
        .iter()
        .map(|item| {
            // the leading paragraph is the item's own text
            let (text, rest) = match item.content.split_first() {
                Some((first, rest)) if first.node_type == NodeType::Paragraph => {
                    (inline_markdown(&first.content), rest)
                }
                _ => (String::new(), item.content.as_slice()),
            };
            let content = if node.node_type == NodeType::TaskList {
                BlockContent::TaskItem {
                    checked: item.attr_bool("checked").unwrap_or(false),
                    text,
                }
            } else {
                BlockContent::ListItem { text }
            };
            Block::new(content, item.source_range().unwrap_or(range))
                .with_children(blocks_of(rest, settings))
        })
        .collect();

    Block::new(content, range).with_children(items)
}

fn table(node: &EditorNode) -> BlockContent {
    let mut headers = Vec::new();
    let mut rows = Vec::new();
    let mut alignments = Vec::new();

    for row in node.content.iter().filter(|r| r.node_type == NodeType::TableRow) {
        let cells: Vec<String> = row.content.iter().map(cell_markdown).collect();
        let is_header = row
            .content
            .first()
            .is_some_and(|c| c.node_type == NodeType::TableHeader);
        if is_header && headers.is_empty() {
            alignments = row
                .content
                .iter()
                .map(|c| match c.attr_str("align") {
                    Some("left") => Some(Alignment::Left),
                    Some("center") => Some(Alignment::Center),
                    Some("right") => Some(Alignment::Right),
                    _ => None,
                })
                .collect();
            headers = cells;
        } else {
            rows.push(cells);
        }
    }

    // all-default alignment is written as no alignment
    if alignments.iter().all(Option::is_none) {
        alignments.clear();
    }
    BlockContent::Table {
        headers,
        rows,
        alignments,
    }
}

fn cell_markdown(cell: &EditorNode) -> String {
    cell.content
        .iter()
        .map(|p| inline_markdown(&p.content))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders block content nested in a quote or callout.
fn nested_markdown(nodes: &[EditorNode], settings: &dyn SerializerSettings) -> String {
    let blocks = blocks_of(nodes, settings);
    Serializer::new(settings)
        .render(&blocks)
        .trim_end_matches('\n')
        .to_string()
}

/// Renders inline nodes with their marks as Markdown.
pub fn inline_markdown(nodes: &[EditorNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node.node_type {
            NodeType::Text => {
                let text = node.text.as_deref().unwrap_or_default();
                out.push_str(&marked(text, &node.marks));
            }
            NodeType::HardBreak => out.push_str("  \n"),
            NodeType::Image => {
                let src = node.attr_str("src").unwrap_or_default();
                let alt = node.attr_str("alt").unwrap_or_default();
                out.push_str(&format!("![{}]({src})", escape_text(alt)));
            }
            _ => out.push_str(&inline_markdown(&node.content)),
        }
    }
    out
}

fn marked(text: &str, marks: &[Mark]) -> String {
    if text.is_empty() {
        return String::new();
    }
    let out = if marks.iter().any(|m| m.mark_type == MarkType::Code) {
        code_span(text)
    } else {
        escape_text(text)
    };
    // emphasis delimiters must hug non-space text
    let lead = out.len() - out.trim_start().len();
    let trail = out.len() - out.trim_end().len();
    let (before, rest) = out.split_at(lead);
    let (core, after) = rest.split_at(rest.len() - trail);
    let (before, after) = (before.to_string(), after.to_string());
    let mut core = core.to_string();

    for mark_type in [MarkType::Strike, MarkType::Italic, MarkType::Bold] {
        if !core.is_empty() && marks.iter().any(|m| m.mark_type == mark_type) {
            let delim = match mark_type {
                MarkType::Strike => "~~",
                MarkType::Italic => "*",
                _ => "**",
            };
            core = format!("{delim}{core}{delim}");
        }
    }
    if let Some(link) = marks.iter().find(|m| m.mark_type == MarkType::Link) {
        let href = link.attrs.get("href").and_then(|v| v.as_str()).unwrap_or_default();
        let title = link
            .attrs
            .get("title")
            .and_then(|v| v.as_str())
            .map(|t| format!(" \"{}\"", t.replace('"', "\\\"")))
            .unwrap_or_default();
        core = format!("[{core}]({href}{title})");
    }
    format!("{before}{core}{after}")
}

fn code_span(text: &str) -> String {
    let longest = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let ticks = "`".repeat(longest + 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{ticks} {text} {ticks}")
    } else {
        format!("{ticks}{text}{ticks}")
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
