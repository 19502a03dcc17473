//! Syntax tree → Block conversion.
//!
//! One syntax node yields at most one [`Block`]. Three detection passes sit
//! on top of the generic mapping: callouts inside quotes, standalone images
//! and links inside single-child paragraphs, and toggles reassembled from
//! raw-markup fragments spread over several siblings.

use serde::{Deserialize, Serialize};

use crate::blocks::{Alignment, Block, BlockContent, BlockType, SourceRange};
use crate::error::ConvertError;

use super::adapter::{ParserExtensions, parse_syntax};
use super::kinds::callout;
use super::kinds::image::{ImageTag, parse_img_tag};
use super::kinds::toggle::{self, Fragment, ToggleMarkup, ToggleReassembly, ToggleSibling};
use super::kinds::BlockQuote;
use super::syntax::{NodeKind, SyntaxNode, render_inlines};

/// Highest heading level the block model carries.
pub const MAX_HEADING_LEVEL: u8 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConvertMode {
    #[default]
    Full,
    /// Paragraph, heading, divider, list and code only; no reassembly passes.
    Simplified,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertOptions {
    pub mode: ConvertMode,
    pub toggles: ToggleReassembly,
    pub extensions: ParserExtensions,
}

impl ConvertOptions {
    pub fn simplified() -> Self {
        Self {
            mode: ConvertMode::Simplified,
            toggles: ToggleReassembly::default(),
            extensions: ParserExtensions::minimal(),
        }
    }

    #[must_use]
    pub fn with_toggles(mut self, toggles: ToggleReassembly) -> Self {
        self.toggles = toggles;
        self
    }

    fn simplified_mode(&self) -> bool {
        self.mode == ConvertMode::Simplified
    }
}

impl ToggleSibling for Block {
    fn is_toggle(&self) -> bool {
        self.block_type() == BlockType::Toggle
    }

    fn absorb(&mut self, child: Self) {
        self.source_range = self.source_range.union(child.source_range);
        self.children.push(child);
    }

    fn extend_to(&mut self, end: usize) {
        self.source_range.end = self.source_range.end.max(end);
    }
}

/// Converts syntax nodes of one source text into blocks.
pub struct BlockConverter<'a> {
    source: &'a str,
    options: &'a ConvertOptions,
}

impl<'a> BlockConverter<'a> {
    pub fn new(source: &'a str, options: &'a ConvertOptions) -> Self {
        Self { source, options }
    }

    pub fn convert_document(&self, root: &SyntaxNode) -> Vec<Block> {
        self.convert_siblings(&root.children)
    }

    /// Converts a run of sibling nodes, skipping (and logging) nodes that fail,
    /// then folds toggle fragments into toggles.
    pub fn convert_siblings(&self, nodes: &[SyntaxNode]) -> Vec<Block> {
        let fragments: Vec<Fragment<Block>> = nodes
            .iter()
            .filter_map(|node| match self.fragment(node) {
                Ok(fragment) => fragment,
                Err(err) => {
                    log::warn!("skipping {} at {}: {err}", node.kind.name(), node.range);
                    None
                }
            })
            .collect();

        if self.options.simplified_mode() {
            return fragments
                .into_iter()
                .filter_map(|f| match f {
                    Fragment::Item(block) => Some(block),
                    _ => None,
                })
                .collect();
        }
        toggle::reassemble(fragments, self.options.toggles)
    }

    /// Converts one node in isolation. A lone closing tag yields nothing.
    pub fn convert_node(&self, node: &SyntaxNode) -> Result<Option<Block>, ConvertError> {
        Ok(match self.fragment(node)? {
            Some(Fragment::Item(block) | Fragment::OpenToggle(block)) => Some(block),
            Some(Fragment::Close(_)) | None => None,
        })
    }

    fn fragment(&self, node: &SyntaxNode) -> Result<Option<Fragment<Block>>, ConvertError> {
        let range = node.range;
        let item = |content: BlockContent| Some(Fragment::Item(Block::new(content, range)));

        Ok(match &node.kind {
            NodeKind::Paragraph => item(self.paragraph(node)?),
            NodeKind::Heading { level } => {
                if *level > MAX_HEADING_LEVEL {
                    log::debug!("clamping h{level} at {range} to h{MAX_HEADING_LEVEL}");
                }
                item(BlockContent::Heading {
                    level: (*level).clamp(1, MAX_HEADING_LEVEL),
                    text: node.inline_markdown(self.source).trim().to_string(),
                })
            }
            NodeKind::BlockQuote => item(self.quote(node)?),
            NodeKind::List { start } => Some(Fragment::Item(self.list(node, *start)?)),
            NodeKind::CodeBlock { info } => item(code(node, info.as_deref())),
            NodeKind::Rule => item(BlockContent::Divider {}),
            NodeKind::Table { alignments } => {
                if self.options.simplified_mode() {
                    item(self.source_paragraph(node)?)
                } else {
                    item(self.table(node, alignments))
                }
            }
            NodeKind::Html if !self.options.simplified_mode() => self.html(node)?,
            NodeKind::Html => {
                log::debug!("simplified conversion skips raw markup at {range}");
                None
            }
            NodeKind::MetadataBlock => {
                log::debug!("skipping front matter at {range}");
                None
            }
            other => {
                log::warn!("unsupported node {} at {range}, skipping", other.name());
                None
            }
        })
    }

    fn slice(&self, range: SourceRange) -> Result<&'a str, ConvertError> {
        self.source
            .get(range.start..range.end)
            .ok_or(ConvertError::InvalidRange {
                start: range.start,
                end: range.end,
            })
    }

    fn source_paragraph(&self, node: &SyntaxNode) -> Result<BlockContent, ConvertError> {
        Ok(BlockContent::Paragraph {
            text: self.slice(node.range)?.trim().to_string(),
        })
    }

    fn paragraph(&self, node: &SyntaxNode) -> Result<BlockContent, ConvertError> {
        self.slice(node.range)?;
        let text = node.inline_markdown(self.source).trim().to_string();
        if self.options.simplified_mode() {
            return Ok(BlockContent::Paragraph { text });
        }

        // the parser may split one run of text into several leaves
        if node.children.iter().all(|c| c.kind == NodeKind::Text)
            && self.options.extensions.is_bare_url(&text)
        {
            return Ok(BlockContent::Link {
                href: text.clone(),
                text,
                title: None,
            });
        }

        if let [only] = node.children.as_slice() {
            match &only.kind {
                NodeKind::Image { url, title } => {
                    return Ok(BlockContent::Image {
                        src: url.clone(),
                        alt: only.plain_text(),
                        title: non_empty(title),
                        width: None,
                        height: None,
                    });
                }
                NodeKind::Link { url, title, .. } => {
                    return Ok(BlockContent::Link {
                        href: url.clone(),
                        text: only.inline_markdown(self.source),
                        title: non_empty(title),
                    });
                }
                NodeKind::InlineHtml => {
                    if let Some(tag) = only.text.as_deref().and_then(parse_img_tag) {
                        return Ok(image_from_tag(tag));
                    }
                }
                _ => {}
            }
        }
        Ok(BlockContent::Paragraph { text })
    }

    fn quote(&self, node: &SyntaxNode) -> Result<BlockContent, ConvertError> {
        if self.options.simplified_mode() {
            return self.source_paragraph(node);
        }
        let body = BlockQuote::body(self.slice(node.range)?);
        Ok(match callout::split(&body) {
            Some((header, rest)) => BlockContent::Callout {
                kind: header.kind,
                title: header.title,
                body: rest,
            },
            None => BlockContent::Quote { text: body },
        })
    }

    fn list(&self, node: &SyntaxNode, start: Option<u64>) -> Result<Block, ConvertError> {
        let simplified = self.options.simplified_mode();
        let task = !simplified
            && node
                .children
                .iter()
                .any(|item| matches!(item.kind, NodeKind::Item { checked: Some(_) }));

        let content = if task {
            BlockContent::TaskList {}
        } else {
            BlockContent::List {
                ordered: start.is_some(),
                start: start.unwrap_or(1),
            }
        };

        let mut items = Vec::with_capacity(node.children.len());
        for item in &node.children {
            let NodeKind::Item { checked } = item.kind else {
                continue;
            };
            self.slice(item.range)?;
            let (text, rest) = self.item_parts(item);
            let content = if task {
                BlockContent::TaskItem {
                    checked: checked.unwrap_or(false),
                    text,
                }
            } else {
                BlockContent::ListItem { text }
            };

            if simplified {
                items.push(Block::new(content, item.range));
                for nested in rest {
                    if let NodeKind::List { start } = nested.kind {
                        let flat = self.list(nested, start)?;
                        items.extend(flat.children);
                    }
                }
            } else {
                items.push(Block::new(content, item.range).with_children(self.convert_siblings(rest)));
            }
        }

        Ok(Block::new(content, node.range).with_children(items))
    }

    /// Splits an item into its own text and the nodes that become children.
    fn item_parts<'n>(&self, item: &'n SyntaxNode) -> (String, &'n [SyntaxNode]) {
        let children = item.children.as_slice();
        let inline_len = children
            .iter()
            .position(|c| !c.kind.is_inline())
            .unwrap_or(children.len());

        if inline_len > 0 {
            let text = render_inlines(&children[..inline_len], self.source);
            return (text.trim().to_string(), &children[inline_len..]);
        }
        match children.first() {
            Some(first) if first.kind == NodeKind::Paragraph => (
                first.inline_markdown(self.source).trim().to_string(),
                &children[1..],
            ),
            _ => (String::new(), children),
        }
    }

    fn table(&self, node: &SyntaxNode, alignments: &[Option<Alignment>]) -> BlockContent {
        let mut headers = Vec::new();
        let mut rows = Vec::new();
        for part in &node.children {
            match part.kind {
                NodeKind::TableHead => {
                    headers = self.row_cells(part);
                    // some producers wrap the head cells in a row
                    if headers.is_empty()
                        && let Some(row) = part.children.first()
                    {
                        headers = self.row_cells(row);
                    }
                }
                NodeKind::TableRow => rows.push(self.row_cells(part)),
                _ => {}
            }
        }
        BlockContent::Table {
            headers,
            rows,
            alignments: alignments.to_vec(),
        }
    }

    fn row_cells(&self, row: &SyntaxNode) -> Vec<String> {
        row.children
            .iter()
            .filter(|c| c.kind == NodeKind::TableCell)
            .map(|c| c.inline_markdown(self.source).trim().to_string())
            .collect()
    }

    fn html(&self, node: &SyntaxNode) -> Result<Option<Fragment<Block>>, ConvertError> {
        let raw = node.text.as_deref().unwrap_or_default();
        let range = node.range;

        Ok(match toggle::scan(raw) {
            ToggleMarkup::Complete {
                summary,
                open,
                body,
                body_offset,
            } => {
                let root = parse_syntax(body, &self.options.extensions)
                    .map_err(|e| ConvertError::ToggleBody(e.message().to_string()))?;
                let mut children = BlockConverter::new(body, self.options).convert_document(&root);
                for child in &mut children {
                    child.shift(range.start + body_offset);
                    clamp_into(child, range);
                }
                Some(Fragment::Item(
                    Block::new(BlockContent::Toggle { summary, open }, range).with_children(children),
                ))
            }
            ToggleMarkup::Open { summary, open } => Some(Fragment::OpenToggle(Block::new(
                BlockContent::Toggle { summary, open },
                range,
            ))),
            ToggleMarkup::Close => Some(Fragment::Close(range.end)),
            ToggleMarkup::None => match parse_img_tag(raw) {
                Some(tag) => Some(Fragment::Item(Block::new(image_from_tag(tag), range))),
                None => {
                    log::debug!("skipping raw markup at {range}");
                    None
                }
            },
        })
    }
}

fn code(node: &SyntaxNode, info: Option<&str>) -> BlockContent {
    let mut code: String = node
        .children
        .iter()
        .filter_map(|c| c.text.as_deref())
        .collect();
    if code.ends_with('\n') {
        code.pop();
    }
    BlockContent::Code {
        language: info
            .and_then(|i| i.split_whitespace().next())
            .map(str::to_string),
        code,
    }
}

fn image_from_tag(tag: ImageTag) -> BlockContent {
    BlockContent::Image {
        src: tag.src,
        alt: tag.alt,
        title: tag.title,
        width: tag.width,
        height: tag.height,
    }
}

/// Pulls a block (and its descendants) inside `bounds`.
fn clamp_into(block: &mut Block, bounds: SourceRange) {
    let clamp = |v: usize| v.clamp(bounds.start, bounds.end);
    block.source_range = SourceRange::new(clamp(block.source_range.start), clamp(block.source_range.end));
    let own = block.source_range;
    for child in &mut block.children {
        clamp_into(child, own);
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
