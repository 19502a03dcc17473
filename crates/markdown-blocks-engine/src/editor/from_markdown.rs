use serde::{Deserialize, Serialize};

use crate::blocks::{Alignment, SourceRange};
use crate::error::EngineError;
use crate::parsing::convert::MAX_HEADING_LEVEL;
use crate::parsing::kinds::callout;
use crate::parsing::kinds::image::{ImageTag, parse_img_tag};
use crate::parsing::kinds::toggle::{self, Fragment, ToggleMarkup, ToggleReassembly};
use crate::parsing::kinds::BlockQuote;
use crate::parsing::{NodeKind, ParserExtensions, SyntaxNode, parse_syntax};
use crate::validation::validate_input;

use super::node::{EditorNode, Mark, MarkType, NodeType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOptions {
    pub toggles: ToggleReassembly,
    pub extensions: ParserExtensions,
}

/// Parses Markdown into an editor document.
///
/// Nodes mapped straight from the source carry `sourceStart`/`sourceEnd`.
/// A callout's body is re-parsed from its unquoted text and has no
/// positions.
pub fn markdown_to_editor(text: &str, options: &EditorOptions) -> Result<EditorNode, EngineError> {
    validate_input(text)?;
    let root = parse_syntax(text, &options.extensions)?;
    let content = EditorConverter { source: text, options }.siblings(&root.children, 0);
    Ok(EditorNode::new(NodeType::Doc)
        .at(SourceRange::new(0, text.len()))
        .with_content(content))
}

struct EditorConverter<'a> {
    source: &'a str,
    options: &'a EditorOptions,
}

impl EditorConverter<'_> {
    /// `offset` shifts positions of a nested parse into document space.
    fn siblings(&self, nodes: &[SyntaxNode], offset: usize) -> Vec<EditorNode> {
        let fragments = nodes
            .iter()
            .filter_map(|node| self.fragment(node, offset))
            .collect();
        toggle::reassemble(fragments, self.options.toggles)
    }

    fn fragment(&self, node: &SyntaxNode, offset: usize) -> Option<Fragment<EditorNode>> {
        let range = node.range.shifted(offset);
        let item = |n: EditorNode| Some(Fragment::Item(n.at(range)));

        match &node.kind {
            NodeKind::Paragraph => item(self.paragraph(node)),
            NodeKind::Heading { level } => item(
                EditorNode::new(NodeType::Heading)
                    .with_attr("level", (*level).clamp(1, MAX_HEADING_LEVEL))
                    .with_content(self.inlines(&node.children)),
            ),
            NodeKind::BlockQuote => item(self.quote(node, offset)),
            NodeKind::List { start } => item(self.list(node, *start, offset)),
            NodeKind::CodeBlock { info } => {
                let mut code: String = node
                    .children
                    .iter()
                    .filter_map(|c| c.text.as_deref())
                    .collect();
                if code.ends_with('\n') {
                    code.pop();
                }
                let language = info
                    .as_deref()
                    .and_then(|i| i.split_whitespace().next())
                    .map_or(serde_json::Value::Null, Into::into);
                let mut block = EditorNode::new(NodeType::CodeBlock).with_attr("language", language);
                if !code.is_empty() {
                    block.content.push(EditorNode::text(code, vec![]));
                }
                item(block)
            }
            NodeKind::Rule => item(EditorNode::new(NodeType::HorizontalRule)),
            NodeKind::Table { alignments } => item(self.table(node, alignments)),
            NodeKind::Html => self.html(node, range),
            other => {
                log::debug!("editor conversion skips {} at {range}", other.name());
                None
            }
        }
    }

    fn paragraph(&self, node: &SyntaxNode) -> EditorNode {
        if let [only] = node.children.as_slice() {
            match &only.kind {
                NodeKind::Image { url, title } => {
                    return image(ImageTag {
                        src: url.clone(),
                        alt: only.plain_text(),
                        title: (!title.is_empty()).then(|| title.clone()),
                        width: None,
                        height: None,
                    });
                }
                NodeKind::InlineHtml => {
                    if let Some(tag) = only.text.as_deref().and_then(parse_img_tag) {
                        return image(tag);
                    }
                }
                _ => {}
            }
        }
        EditorNode::new(NodeType::Paragraph).with_content(self.inlines(&node.children))
    }

    fn quote(&self, node: &SyntaxNode, offset: usize) -> EditorNode {
        let Some(slice) = self.source.get(node.range.start..node.range.end) else {
            return EditorNode::new(NodeType::Blockquote);
        };
        let body = BlockQuote::body(slice);
        match callout::split(&body) {
            Some((header, rest)) => {
                let mut callout = EditorNode::new(NodeType::Callout)
                    .with_attr("kind", header.kind.marker().to_ascii_lowercase());
                if let Some(title) = header.title {
                    callout = callout.with_attr("title", title);
                }
                callout.with_content(self.detached(&rest))
            }
            None => EditorNode::new(NodeType::Blockquote)
                .with_content(self.siblings(&node.children, offset)),
        }
    }

    /// Converts Markdown that is not a verbatim slice of the source.
    fn detached(&self, text: &str) -> Vec<EditorNode> {
        match parse_syntax(text, &self.options.extensions) {
            Ok(root) => {
                let converter = EditorConverter {
                    source: text,
                    options: self.options,
                };
                let mut nodes = converter.siblings(&root.children, 0);
                nodes.iter_mut().for_each(strip_positions);
                nodes
            }
            Err(err) => {
                log::warn!("callout body could not be parsed: {err}");
                Vec::new()
            }
        }
    }

    fn list(&self, node: &SyntaxNode, start: Option<u64>, offset: usize) -> EditorNode {
        let task = node
            .children
            .iter()
            .any(|item| matches!(item.kind, NodeKind::Item { checked: Some(_) }));
        let mut list = match (task, start) {
            (true, _) => EditorNode::new(NodeType::TaskList),
            (false, Some(start)) => EditorNode::new(NodeType::OrderedList).with_attr("start", start),
            (false, None) => EditorNode::new(NodeType::BulletList),
        };

        for item in &node.children {
            let NodeKind::Item { checked } = item.kind else {
                continue;
            };
            let entry_type = if task { NodeType::TaskItem } else { NodeType::ListItem };
            let mut entry = EditorNode::new(entry_type).at(item.range.shifted(offset));
            if task {
                entry = entry.with_attr("checked", checked.unwrap_or(false));
            }

            // tight items hold their inlines directly; the editor wants a paragraph
            let inline_len = item
                .children
                .iter()
                .position(|c| !c.kind.is_inline())
                .unwrap_or(item.children.len());
            if inline_len > 0 {
                let inlines = &item.children[..inline_len];
                let span = inlines[0].range.union(inlines[inline_len - 1].range);
                entry.content.push(
                    EditorNode::new(NodeType::Paragraph)
                        .at(span.shifted(offset))
                        .with_content(self.inlines(inlines)),
                );
            }
            entry
                .content
                .extend(self.siblings(&item.children[inline_len..], offset));
            list.content.push(entry);
        }
        list
    }

    fn table(&self, node: &SyntaxNode, alignments: &[Option<Alignment>]) -> EditorNode {
        let mut rows = Vec::new();
        for part in &node.children {
            let (cells_of, cell_type) = match part.kind {
                // the head may hold its cells directly or wrapped in a row
                NodeKind::TableHead => match part.children.first() {
                    Some(row) if row.kind == NodeKind::TableRow => (row, NodeType::TableHeader),
                    _ => (part, NodeType::TableHeader),
                },
                NodeKind::TableRow => (part, NodeType::TableCell),
                _ => continue,
            };
            let cells = cells_of
                .children
                .iter()
                .filter(|c| c.kind == NodeKind::TableCell)
                .enumerate()
                .map(|(i, cell)| {
                    let mut out = EditorNode::new(cell_type).with_content(vec![
                        EditorNode::new(NodeType::Paragraph).with_content(self.inlines(&cell.children)),
                    ]);
                    if let Some(Some(align)) = alignments.get(i) {
                        out = out.with_attr("align", alignment_name(*align));
                    }
                    out
                })
                .collect();
            rows.push(EditorNode::new(NodeType::TableRow).with_content(cells));
        }
        EditorNode::new(NodeType::Table).with_content(rows)
    }

    fn html(&self, node: &SyntaxNode, range: SourceRange) -> Option<Fragment<EditorNode>> {
        let raw = node.text.as_deref().unwrap_or_default();
        match toggle::scan(raw) {
            ToggleMarkup::Complete {
                summary,
                open,
                body,
                body_offset,
            } => {
                let content = match parse_syntax(body, &self.options.extensions) {
                    Ok(root) => EditorConverter {
                        source: body,
                        options: self.options,
                    }
                    .siblings(&root.children, range.start + body_offset),
                    Err(err) => {
                        log::warn!("skipping toggle body at {range}: {err}");
                        return None;
                    }
                };
                Some(Fragment::Item(
                    details(summary, open).at(range).with_content(content),
                ))
            }
            ToggleMarkup::Open { summary, open } => {
                Some(Fragment::OpenToggle(details(summary, open).at(range)))
            }
            ToggleMarkup::Close => Some(Fragment::Close(range.end)),
            ToggleMarkup::None => match parse_img_tag(raw) {
                Some(tag) => Some(Fragment::Item(image(tag).at(range))),
                None => {
                    log::debug!("editor conversion skips raw markup at {range}");
                    None
                }
            },
        }
    }

    fn inlines(&self, nodes: &[SyntaxNode]) -> Vec<EditorNode> {
        let mut out = Vec::new();
        for node in nodes {
            self.inline(node, &[], &mut out);
        }
        merge_text(out)
    }

    fn inline(&self, node: &SyntaxNode, marks: &[Mark], out: &mut Vec<EditorNode>) {
        let with = |mark: Mark| {
            let mut marks = marks.to_vec();
            marks.push(mark);
            marks
        };
        match &node.kind {
            NodeKind::Text => {
                if let Some(text) = &node.text {
                    out.push(EditorNode::text(text.clone(), marks.to_vec()));
                }
            }
            NodeKind::Code => {
                let text = node.text.clone().unwrap_or_default();
                out.push(EditorNode::text(text, with(Mark::new(MarkType::Code))));
            }
            NodeKind::SoftBreak => out.push(EditorNode::text(" ", marks.to_vec())),
            NodeKind::HardBreak => out.push(EditorNode::new(NodeType::HardBreak)),
            NodeKind::Emphasis | NodeKind::Strong | NodeKind::Strikethrough => {
                let mark_type = match node.kind {
                    NodeKind::Emphasis => MarkType::Italic,
                    NodeKind::Strong => MarkType::Bold,
                    _ => MarkType::Strike,
                };
                let marks = with(Mark::new(mark_type));
                for child in &node.children {
                    self.inline(child, &marks, out);
                }
            }
            NodeKind::Link { url, title, .. } => {
                let title = (!title.is_empty()).then_some(title.as_str());
                let marks = with(Mark::link(url, title));
                for child in &node.children {
                    self.inline(child, &marks, out);
                }
            }
            NodeKind::Image { url, title } => out.push(image(ImageTag {
                src: url.clone(),
                alt: node.plain_text(),
                title: (!title.is_empty()).then(|| title.clone()),
                width: None,
                height: None,
            })),
            _ => {
                // raw inline markup, math and footnote references stay literal
                let literal = self
                    .source
                    .get(node.range.start..node.range.end)
                    .map(str::to_string)
                    .or_else(|| node.text.clone())
                    .unwrap_or_default();
                if !literal.is_empty() {
                    out.push(EditorNode::text(literal, marks.to_vec()));
                }
            }
        }
    }
}

fn image(tag: ImageTag) -> EditorNode {
    let mut node = EditorNode::new(NodeType::Image)
        .with_attr("src", tag.src)
        .with_attr("alt", tag.alt);
    if let Some(title) = tag.title {
        node = node.with_attr("title", title);
    }
    if let Some(width) = tag.width {
        node = node.with_attr("width", width);
    }
    if let Some(height) = tag.height {
        node = node.with_attr("height", height);
    }
    node
}

fn details(summary: String, open: bool) -> EditorNode {
    EditorNode::new(NodeType::Details)
        .with_attr("summary", summary)
        .with_attr("open", open)
}

fn alignment_name(align: Alignment) -> &'static str {
    match align {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
    }
}

/// Joins adjacent text nodes that carry the same marks.
fn merge_text(nodes: Vec<EditorNode>) -> Vec<EditorNode> {
    let mut out: Vec<EditorNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let Some(last) = out.last_mut()
            && last.node_type == NodeType::Text
            && node.node_type == NodeType::Text
            && last.marks == node.marks
            && let (Some(a), Some(b)) = (last.text.as_mut(), node.text.as_deref())
        {
            a.push_str(b);
            continue;
        }
        out.push(node);
    }
    out
}

fn strip_positions(node: &mut EditorNode) {
    node.attrs.remove(super::node::SOURCE_START);
    node.attrs.remove(super::node::SOURCE_END);
    node.content.iter_mut().for_each(strip_positions);
}
