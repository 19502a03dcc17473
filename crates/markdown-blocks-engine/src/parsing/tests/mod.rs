//! Conversion tests for the parsing module.
//!
//! Every parse goes through [`invariants::check`] before assertions run.


use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::blocks::{Alignment, Block, BlockContent, BlockType, CalloutKind};
use crate::parsing::kinds::ToggleReassembly;
use crate::parsing::{ConvertOptions, parse_blocks};

use BlockType::*;

fn parse(text: &str) -> Vec<Block> {
    parse_with(text, &ConvertOptions::default())
}

fn parse_with(text: &str, options: &ConvertOptions) -> Vec<Block> {
    let blocks = parse_blocks(text, options).unwrap();
    invariants::check(text, &blocks);
    blocks
}

#[rstest]
#[case::empty("")]
#[case::spaces("   ")]
#[case::newlines("\n\n\t\n")]
fn blank_input_yields_no_blocks(#[case] text: &str) {
    assert!(parse(text).is_empty());
}

#[test]
fn headings_keep_their_levels() {
    let blocks = parse("# Heading 1\n## Heading 2\n### Heading 3");
    let levels: Vec<_> = blocks
        .iter()
        .map(|b| match &b.content {
            BlockContent::Heading { level, text } => (*level, text.as_str()),
            other => panic!("expected heading, got {other:?}"),
        })
        .collect();
    assert_eq!(
        levels,
        vec![(1, "Heading 1"), (2, "Heading 2"), (3, "Heading 3")]
    );
}

#[test]
fn deep_headings_clamp_to_three() {
    let blocks = parse("##### Deep *one*");
    assert_eq!(
        blocks[0].content,
        BlockContent::Heading {
            level: 3,
            text: "Deep *one*".into()
        }
    );
}

#[test]
fn rule_is_a_divider() {
    let blocks = parse("---");
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].content, BlockContent::Divider {});
}

#[test]
fn lone_image_is_unwrapped() {
    let blocks = parse("![alt text](img.png \"Title\")");
    assert_eq!(
        blocks[0].content,
        BlockContent::Image {
            src: "img.png".into(),
            alt: "alt text".into(),
            title: Some("Title".into()),
            width: None,
            height: None,
        }
    );
}

#[test]
fn lone_link_is_unwrapped() {
    let blocks = parse("[Example **site**](https://example.com)");
    assert_eq!(
        blocks[0].content,
        BlockContent::Link {
            href: "https://example.com".into(),
            text: "Example **site**".into(),
            title: None,
        }
    );
}

#[test]
fn bare_url_becomes_link() {
    let blocks = parse("https://example.com/page");
    assert_eq!(blocks[0].block_type(), Link);
}

#[test]
fn image_with_text_stays_a_paragraph() {
    let blocks = parse("See ![x](a.png) here");
    assert_eq!(
        blocks[0].content,
        BlockContent::Paragraph {
            text: "See ![x](a.png) here".into()
        }
    );
}

#[test]
fn sized_img_tag_becomes_image() {
    let blocks = parse("<img src=\"a.png\" alt=\"A\" width=\"200\">\n");
    assert_eq!(
        blocks[0].content,
        BlockContent::Image {
            src: "a.png".into(),
            alt: "A".into(),
            title: None,
            width: Some(200),
            height: None,
        }
    );
}

#[test]
fn any_marker_makes_a_task_list() {
    let blocks = parse("- [x] done\n- [ ] todo\n- plain");
    assert_eq!(blocks[0].content, BlockContent::TaskList {});
    let items: Vec<_> = blocks[0]
        .children
        .iter()
        .map(|b| match &b.content {
            BlockContent::TaskItem { checked, text } => (*checked, text.as_str()),
            other => panic!("expected task item, got {other:?}"),
        })
        .collect();
    assert_eq!(
        items,
        vec![(true, "done"), (false, "todo"), (false, "plain")]
    );
}

#[test]
fn ordered_list_keeps_start_number() {
    let blocks = parse("3. three\n4. four");
    assert_eq!(
        blocks[0].content,
        BlockContent::List {
            ordered: true,
            start: 3
        }
    );
    assert_eq!(blocks[0].children.len(), 2);
}

#[test]
fn unordered_list_starts_at_one() {
    let blocks = parse("* a\n* b");
    assert_eq!(
        blocks[0].content,
        BlockContent::List {
            ordered: false,
            start: 1
        }
    );
}

#[test]
fn nested_lists_become_item_children() {
    let blocks = parse("- a\n  - b\n  - c\n- d");
    assert_eq!(types(&blocks), vec![List, ListItem, List, ListItem, ListItem, ListItem]);
    let first = &blocks[0].children[0];
    assert_eq!(first.content.text(), Some("a"));
    assert_eq!(first.children[0].children[1].content.text(), Some("c"));
}

#[test]
fn loose_items_read_like_tight_ones() {
    let blocks = parse("- one\n\n- two\n");
    let texts: Vec<_> = blocks[0]
        .children
        .iter()
        .filter_map(|b| b.content.text())
        .collect();
    assert_eq!(texts, vec!["one", "two"]);
}

#[test]
fn plain_quote() {
    let blocks = parse("> first\n> second *line*");
    assert_eq!(
        blocks[0].content,
        BlockContent::Quote {
            text: "first\nsecond *line*".into()
        }
    );
}

#[rstest]
#[case::admonition("> [!WARNING] Careful\n> body line", CalloutKind::Warning, Some("Careful"), "body line")]
#[case::admonition_no_title("> [!tip]\n> Use it", CalloutKind::Tip, None, "Use it")]
#[case::emoji_label("> 💡 **Tip**\n> Use it", CalloutKind::Tip, None, "Use it")]
#[case::emoji_title("> ⚠️ **Heads up**\n> Mind the gap", CalloutKind::Warning, Some("Heads up"), "Mind the gap")]
#[case::unknown_marker("> [!QUESTION] Why\n> Because", CalloutKind::Note, Some("Why"), "Because")]
fn callouts_are_detected(
    #[case] text: &str,
    #[case] kind: CalloutKind,
    #[case] title: Option<&str>,
    #[case] body: &str,
) {
    let blocks = parse(text);
    assert_eq!(
        blocks[0].content,
        BlockContent::Callout {
            kind,
            title: title.map(str::to_string),
            body: body.into(),
        }
    );
}

#[test]
fn fenced_code_keeps_first_info_word() {
    let blocks = parse("```rust title=main.rs\nfn main() {}\n```\n");
    assert_eq!(
        blocks[0].content,
        BlockContent::Code {
            language: Some("rust".into()),
            code: "fn main() {}".into()
        }
    );
}

#[test]
fn indented_code_has_no_language() {
    let blocks = parse("    let x = 1;\n");
    assert_eq!(
        blocks[0].content,
        BlockContent::Code {
            language: None,
            code: "let x = 1;".into()
        }
    );
}

#[test]
fn table_cells_and_alignments() {
    let blocks = parse("| a | *b* | c |\n|:--|:-:|---|\n| 1 | 2 | 3 |\n| 4 | 5 | 6 |");
    assert_eq!(
        blocks[0].content,
        BlockContent::Table {
            headers: vec!["a".into(), "*b*".into(), "c".into()],
            rows: vec![
                vec!["1".into(), "2".into(), "3".into()],
                vec!["4".into(), "5".into(), "6".into()],
            ],
            alignments: vec![Some(Alignment::Left), Some(Alignment::Center), None],
        }
    );
}

#[test]
fn complete_toggle_parses_its_body() {
    let text = "<details open><summary>More</summary>\nHidden *text*\n</details>\n";
    let blocks = parse(text);
    assert_eq!(blocks.len(), 1);
    assert_eq!(
        blocks[0].content,
        BlockContent::Toggle {
            summary: "More".into(),
            open: true
        }
    );
    assert_eq!(blocks[0].children[0].content.text(), Some("Hidden *text*"));
    let child = blocks[0].children[0].source_range;
    assert!(text[child.start..child.end].starts_with("Hidden"));
}

const SPLIT_TOGGLE: &str =
    "<details>\n<summary>More</summary>\n\nHidden paragraph\n\n</details>\n\nAfter\n";

#[test]
fn split_toggle_absorbs_until_next_toggle() {
    let blocks = parse(SPLIT_TOGGLE);
    assert_eq!(types(&blocks), vec![Toggle, Paragraph, Paragraph]);
    assert_eq!(blocks[0].children[1].content.text(), Some("After"));
}

#[test]
fn split_toggle_stops_at_closing_tag_when_matching() {
    let options = ConvertOptions::default().with_toggles(ToggleReassembly::MatchClosingTag);
    let blocks = parse_with(SPLIT_TOGGLE, &options);
    assert_eq!(types(&blocks), vec![Toggle, Paragraph, Paragraph]);
    assert_eq!(blocks[0].children.len(), 1);
    assert_eq!(blocks[1].content.text(), Some("After"));
}

#[test]
fn toggle_without_anything_after_has_no_children() {
    let blocks = parse("<details>\n<summary>Empty</summary>\n");
    assert_eq!(types(&blocks), vec![Toggle]);
}

#[test]
fn other_markup_and_front_matter_are_skipped() {
    assert!(parse("<div>\nhi\n</div>\n").is_empty());
    let blocks = parse("---\ntitle: x\n---\n\n# Title\n");
    assert_eq!(types(&blocks), vec![Heading]);
}

#[test]
fn simplified_mode_degrades_rich_types() {
    let text = "> [!NOTE] x\n\n- [x] task\n  - nested\n\n![i](a.png)\n\n<details>\n<summary>S</summary>\n";
    let blocks = parse_with(text, &ConvertOptions::simplified());
    assert_eq!(types(&blocks), vec![Paragraph, List, ListItem, ListItem, Paragraph]);
    assert_eq!(blocks[0].content.text(), Some("> [!NOTE] x"));
    assert_eq!(blocks[1].children[1].content.text(), Some("nested"));
}

#[test]
fn mixed_document_holds_invariants() {
    let text = "\
# Title

Intro with `code` and a [link](x).

- [ ] a
  > nested quote
- [x] b

1. one
   ```
   inner
   ```
2. two

| h |
|---|
| v |

<details>
<summary>T</summary>

inside

</details>

---
";
    let blocks = parse(text);
    assert_eq!(
        types(&blocks)[..4],
        [Heading, Paragraph, TaskList, TaskItem]
    );
}

#[test]
fn multibyte_text_keeps_ranges_on_char_boundaries() {
    parse("# Ünïcödé 🎉\n\n> ℹ️ **Info**\n> 日本語\n\n- é\n- 🎉");
}

fn types(blocks: &[Block]) -> Vec<BlockType> {
    invariants::types(blocks)
}

#[test]
fn single_nodes_convert_in_isolation() {
    let text = "# Title\n\n</details>\n";
    let options = ConvertOptions::default();
    let root = crate::parsing::parse_syntax(text, &options.extensions).unwrap();
    let converter = crate::parsing::BlockConverter::new(text, &options);

    let heading = converter.convert_node(&root.children[0]).unwrap().unwrap();
    assert_eq!(heading.block_type(), Heading);
    assert!(converter.convert_node(&root.children[1]).unwrap().is_none());
}
