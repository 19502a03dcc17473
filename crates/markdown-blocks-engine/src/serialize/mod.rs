//! Block tree → Markdown.
//!
//! The structural inverse of [`crate::parsing::convert`]. Output is
//! normalized rather than byte-identical to whatever was parsed: top-level
//! blocks are separated by one blank line and the text ends with a newline.

use crate::blocks::{Alignment, Block, BlockContent, CalloutKind};
use crate::error::EngineError;
use crate::parsing::kinds::callout::{self, CalloutStyle};
use crate::parsing::kinds::image::{ImageTag, render_img_tag};
use crate::parsing::kinds::{BlockQuote, CodeFence};
use crate::validation;

/// Stylistic choices the host supplies; read-only to the serializer.
pub trait SerializerSettings {
    fn callout_style(&self) -> CalloutStyle;
}

impl SerializerSettings for CalloutStyle {
    fn callout_style(&self) -> CalloutStyle {
        *self
    }
}

pub struct Serializer<'a> {
    settings: &'a dyn SerializerSettings,
}

impl<'a> Serializer<'a> {
    pub fn new(settings: &'a dyn SerializerSettings) -> Self {
        Self { settings }
    }

    /// Validates `blocks`, then renders them.
    pub fn serialize(&self, blocks: &[Block]) -> Result<String, EngineError> {
        validation::validate_blocks(blocks).map_err(|err| match err {
            EngineError::Validation { .. } => err,
            other => EngineError::serialization(other.message()),
        })?;
        Ok(self.render(blocks))
    }

    /// Renders without validating. Never fails.
    pub fn render(&self, blocks: &[Block]) -> String {
        let mut out = self.render_run(blocks, false);
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    fn render_run(&self, blocks: &[Block], tight_lists: bool) -> String {
        let mut out = String::new();
        let mut prev: Option<&Block> = None;
        let mut alternate = false;

        for block in blocks {
            if let Some(p) = prev {
                let same_family = list_family(p).is_some() && list_family(p) == list_family(block);
                alternate = same_family && !alternate;
                out.push_str(if tight_lists && list_family(block).is_some() {
                    "\n"
                } else {
                    "\n\n"
                });
            }
            out.push_str(&self.render_block(block, alternate));
            prev = Some(block);
        }
        out
    }

    fn render_block(&self, block: &Block, alternate: bool) -> String {
        match &block.content {
            BlockContent::Paragraph { text } => text.clone(),
            BlockContent::Heading { level, text } => {
                format!("{} {text}", "#".repeat(usize::from((*level).clamp(1, 6))))
            }
            BlockContent::List { ordered, start } => {
                self.render_list(block, ListStyle::new(*ordered, *start, alternate))
            }
            BlockContent::TaskList {} => self.render_list(block, ListStyle::new(false, 1, alternate)),
            BlockContent::ListItem { .. } | BlockContent::TaskItem { .. } => {
                let marker = ListStyle::new(false, 1, alternate).marker(0);
                self.render_item(block, &marker)
            }
            BlockContent::Quote { text } => BlockQuote::wrap(text),
            BlockContent::Callout { kind, title, body } => self.render_callout(*kind, title.as_deref(), body),
            BlockContent::Code { language, code } => render_code(language.as_deref(), code),
            BlockContent::Divider {} => "---".to_string(),
            BlockContent::Table {
                headers,
                rows,
                alignments,
            } => render_table(headers, rows, alignments),
            BlockContent::Image {
                src,
                alt,
                title,
                width,
                height,
            } => {
                if width.is_some() || height.is_some() {
                    render_img_tag(&ImageTag {
                        src: src.clone(),
                        alt: alt.clone(),
                        title: title.clone(),
                        width: *width,
                        height: *height,
                    })
                } else {
                    format!("![{alt}]({}{})", destination(src), title_suffix(title.as_deref()))
                }
            }
            BlockContent::Link { href, text, title } => {
                format!("[{text}]({}{})", destination(href), title_suffix(title.as_deref()))
            }
            BlockContent::Toggle { summary, open } => self.render_toggle(block, summary, *open),
        }
    }

    fn render_list(&self, list: &Block, style: ListStyle) -> String {
        list.children
            .iter()
            .enumerate()
            .map(|(i, item)| self.render_item(item, &style.marker(i)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_item(&self, item: &Block, marker: &str) -> String {
        let width = marker.chars().count() + 1;
        let (checkbox, text) = match &item.content {
            BlockContent::TaskItem { checked, text } => {
                (Some(if *checked { "[x]" } else { "[ ]" }), text.as_str())
            }
            BlockContent::ListItem { text } => (None, text.as_str()),
            // a non-item inside a list becomes the item's only content
            _ => {
                let body = self.render_block(item, false);
                return format!("{marker} {}", indent_after_first(&body, width));
            }
        };

        let mut head = marker.to_string();
        if let Some(checkbox) = checkbox {
            head.push(' ');
            head.push_str(checkbox);
        }
        if !text.is_empty() {
            head.push(' ');
            head.push_str(&indent_after_first(text, width));
        }

        let body = self.render_run(&item.children, true);
        if body.is_empty() {
            return head;
        }
        let sep = if item.children.first().is_some_and(|c| list_family(c).is_some()) {
            "\n"
        } else {
            "\n\n"
        };
        format!("{head}{sep}{}", indent(&body, width))
    }

    fn render_callout(&self, kind: CalloutKind, title: Option<&str>, body: &str) -> String {
        let header = callout::header_line(kind, title, self.settings.callout_style());
        if body.is_empty() {
            BlockQuote::wrap(&header)
        } else {
            BlockQuote::wrap(&format!("{header}\n{body}"))
        }
    }

    fn render_toggle(&self, toggle: &Block, summary: &str, open: bool) -> String {
        let tag = if open { "<details open>" } else { "<details>" };
        let summary = html_escape::encode_text(summary);
        let body = self.render_run(&toggle.children, false);
        if body.is_empty() {
            format!("{tag}\n<summary>{summary}</summary>\n\n</details>")
        } else {
            format!("{tag}\n<summary>{summary}</summary>\n\n{body}\n\n</details>")
        }
    }
}

/// Bullet lists and task lists merge with each other; ordered lists merge
/// only with ordered lists.
fn list_family(block: &Block) -> Option<bool> {
    match block.content {
        BlockContent::List { ordered, .. } => Some(ordered),
        BlockContent::TaskList {} => Some(false),
        _ => None,
    }
}

struct ListStyle {
    ordered: bool,
    start: u64,
    alternate: bool,
}

impl ListStyle {
    fn new(ordered: bool, start: u64, alternate: bool) -> Self {
        Self {
            ordered,
            start,
            alternate,
        }
    }

    fn marker(&self, index: usize) -> String {
        match (self.ordered, self.alternate) {
            (true, false) => format!("{}.", self.start + index as u64),
            (true, true) => format!("{})", self.start + index as u64),
            (false, false) => "-".to_string(),
            (false, true) => "*".to_string(),
        }
    }
}

fn render_code(language: Option<&str>, code: &str) -> String {
    let fence = CodeFence::fence_for(code);
    let language = language.unwrap_or_default();
    if code.is_empty() {
        format!("{fence}{language}\n{fence}")
    } else {
        format!("{fence}{language}\n{code}\n{fence}")
    }
}

fn render_table(headers: &[String], rows: &[Vec<String>], alignments: &[Option<Alignment>]) -> String {
    let columns = headers.len().max(rows.iter().map(Vec::len).max().unwrap_or(0));
    let row_line = |cells: &[String]| {
        let cells: Vec<String> = (0..columns)
            .map(|i| cells.get(i).map_or(String::new(), |c| escape_pipes(c)))
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let separator: Vec<&str> = (0..columns)
        .map(|i| match alignments.get(i).copied().flatten() {
            Some(Alignment::Left) => ":---",
            Some(Alignment::Center) => ":---:",
            Some(Alignment::Right) => "---:",
            None => "---",
        })
        .collect();

    let mut lines = vec![row_line(headers), format!("| {} |", separator.join(" | "))];
    lines.extend(rows.iter().map(|row| row_line(row)));
    lines.join("\n")
}

/// Escapes `|` not already escaped.
fn escape_pipes(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut prev = None;
    for c in cell.chars() {
        if c == '|' && prev != Some('\\') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn destination(url: &str) -> String {
    if url.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{url}>")
    } else {
        url.to_string()
    }
}

fn title_suffix(title: Option<&str>) -> String {
    match title {
        Some(t) => format!(" \"{}\"", t.replace('"', "\\\"")),
        None => String::new(),
    }
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent_after_first(text: &str, width: usize) -> String {
    match text.split_once('\n') {
        Some((first, rest)) => format!("{first}\n{}", indent(rest, width)),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::SourceRange;
    use pretty_assertions::assert_eq;

    fn block(content: BlockContent) -> Block {
        Block::new(content, SourceRange::default())
    }

    fn item(text: &str) -> Block {
        block(BlockContent::ListItem { text: text.into() })
    }

    fn bullets(items: Vec<Block>) -> Block {
        block(BlockContent::List {
            ordered: false,
            start: 1,
        })
        .with_children(items)
    }

    fn render(blocks: &[Block]) -> String {
        Serializer::new(&CalloutStyle::Admonition).render(blocks)
    }

    #[test]
    fn empty_tree_renders_nothing() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn blocks_are_separated_by_one_blank_line() {
        let out = render(&[
            block(BlockContent::Heading {
                level: 2,
                text: "Title".into(),
            }),
            block(BlockContent::Paragraph { text: "Body".into() }),
            block(BlockContent::Divider {}),
        ]);
        assert_eq!(out, "## Title\n\nBody\n\n---\n");
    }

    #[test]
    fn table_separator_encodes_alignment() {
        let out = render(&[block(BlockContent::Table {
            headers: vec!["a".into(), "b".into(), "c".into()],
            rows: vec![vec!["1".into(), "x|y".into()]],
            alignments: vec![Some(Alignment::Left), Some(Alignment::Center), None],
        })]);
        assert_eq!(
            out,
            "| a | b | c |\n| :--- | :---: | --- |\n| 1 | x\\|y |  |\n"
        );
    }

    #[test]
    fn nested_lists_indent_by_marker_width() {
        let nested = bullets(vec![
            item("a").with_children(vec![bullets(vec![item("b")])]),
            item("c"),
        ]);
        assert_eq!(render(&[nested]), "- a\n  - b\n- c\n");

        let deep = bullets(vec![item("a").with_children(vec![bullets(vec![
            item("b").with_children(vec![bullets(vec![item("c")])]),
        ])])]);
        assert_eq!(render(&[deep]), "- a\n  - b\n    - c\n");

        let ordered = block(BlockContent::List {
            ordered: true,
            start: 9,
        })
        .with_children(vec![
            item("nine"),
            item("ten").with_children(vec![bullets(vec![item("inner")])]),
        ]);
        assert_eq!(render(&[ordered]), "9. nine\n10. ten\n    - inner\n");
    }

    #[test]
    fn adjacent_lists_alternate_markers() {
        let out = render(&[bullets(vec![item("a")]), bullets(vec![item("b")]), bullets(vec![item("c")])]);
        assert_eq!(out, "- a\n\n* b\n\n- c\n");
    }

    #[test]
    fn task_items_render_checkboxes() {
        let list = block(BlockContent::TaskList {}).with_children(vec![
            block(BlockContent::TaskItem {
                checked: true,
                text: "done".into(),
            }),
            block(BlockContent::TaskItem {
                checked: false,
                text: "todo".into(),
            }),
        ]);
        assert_eq!(render(&[list]), "- [x] done\n- [ ] todo\n");
    }

    #[test]
    fn callout_styles() {
        let note = block(BlockContent::Callout {
            kind: CalloutKind::Warning,
            title: Some("Careful".into()),
            body: "line one\n\nline two".into(),
        });
        assert_eq!(
            Serializer::new(&CalloutStyle::Admonition).render(std::slice::from_ref(&note)),
            "> [!WARNING] Careful\n> line one\n>\n> line two\n"
        );
        assert_eq!(
            Serializer::new(&CalloutStyle::Emoji).render(&[note]),
            "> ⚠️ **Careful**\n> line one\n>\n> line two\n"
        );
    }

    #[test]
    fn code_fence_outgrows_inner_backticks() {
        let out = render(&[block(BlockContent::Code {
            language: Some("md".into()),
            code: "```\ninner\n```".into(),
        })]);
        assert_eq!(out, "````md\n```\ninner\n```\n````\n");
    }

    #[test]
    fn toggle_wraps_children() {
        let toggle = block(BlockContent::Toggle {
            summary: "A & B".into(),
            open: true,
        })
        .with_children(vec![block(BlockContent::Paragraph { text: "inside".into() })]);
        assert_eq!(
            render(&[toggle]),
            "<details open>\n<summary>A &amp; B</summary>\n\ninside\n\n</details>\n"
        );
    }

    #[test]
    fn images_and_links() {
        let out = render(&[
            block(BlockContent::Image {
                src: "a b.png".into(),
                alt: "alt".into(),
                title: Some("T".into()),
                width: None,
                height: None,
            }),
            block(BlockContent::Image {
                src: "c.png".into(),
                alt: "sized".into(),
                title: None,
                width: Some(120),
                height: None,
            }),
            block(BlockContent::Link {
                href: "https://x.y".into(),
                text: "site".into(),
                title: None,
            }),
        ]);
        assert_eq!(
            out,
            "![alt](<a b.png> \"T\")\n\n<img src=\"c.png\" alt=\"sized\" width=\"120\">\n\n[site](https://x.y)\n"
        );
    }
}
