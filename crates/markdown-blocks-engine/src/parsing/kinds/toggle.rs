//! Toggle (collapsible `<details>`) recognition and sibling reassembly.
//!
//! CommonMark ends an HTML block at the first blank line, so a toggle written
//!
//! ```text
//! <details>
//! <summary>More</summary>
//!
//! Hidden paragraph
//!
//! </details>
//! ```
//!
//! reaches the converter as three siblings: an opening fragment, a paragraph
//! and a closing fragment. [`reassemble`] folds such runs back into one toggle.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<details(\s[^>]*)?>").unwrap());

static OPEN_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bopen\b").unwrap());

static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*<summary[^>]*>(.*?)</summary\s*>").unwrap());

static CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</details\s*>").unwrap());

/// What a raw-markup fragment contributes to toggle structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleMarkup<'a> {
    /// Open, summary and close all inside one fragment.
    Complete {
        summary: String,
        open: bool,
        /// Markdown between the summary (or opening tag) and the close tag.
        body: &'a str,
        /// Byte offset of `body` within the scanned fragment.
        body_offset: usize,
    },
    /// An opening tag (with optional summary) and no close.
    Open { summary: String, open: bool },
    /// A lone `</details>`.
    Close,
    /// Not toggle markup.
    None,
}

/// Scans one raw-markup fragment for the open/summary/close pattern.
pub fn scan(raw: &str) -> ToggleMarkup<'_> {
    if let Some(open_match) = OPEN_RE.captures(raw) {
        let whole = open_match.get(0).map_or(0..0, |m| m.range());
        let open = open_match
            .get(1)
            .is_some_and(|attrs| OPEN_ATTR_RE.is_match(attrs.as_str()));

        let mut body_start = whole.end;
        let mut summary = String::new();
        if let Some(caps) = SUMMARY_RE.captures(&raw[body_start..]) {
            summary = html_escape::decode_html_entities(caps[1].trim()).into_owned();
            body_start += caps.get(0).map_or(0, |m| m.end());
        }

        return match CLOSE_RE.find(&raw[body_start..]) {
            Some(close) => ToggleMarkup::Complete {
                summary,
                open,
                body: &raw[body_start..body_start + close.start()],
                body_offset: body_start,
            },
            None => ToggleMarkup::Open { summary, open },
        };
    }

    match CLOSE_RE.find(raw) {
        Some(close)
            if raw[..close.start()].trim().is_empty() && raw[close.end()..].trim().is_empty() =>
        {
            ToggleMarkup::Close
        }
        _ => ToggleMarkup::None,
    }
}

/// How an unterminated toggle decides which following siblings it owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToggleReassembly {
    /// A toggle absorbs every following sibling until the next toggle or the
    /// end of the list. Closing fragments are not consulted, so content after
    /// `</details>` is swallowed too. This matches how documents produced by
    /// earlier versions of the editor were read back.
    #[default]
    UntilNextToggle,
    /// Closing fragments end the innermost open toggle; toggles nest.
    MatchClosingTag,
}

/// One converted sibling, as seen by [`reassemble`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment<T> {
    Item(T),
    /// A toggle whose closing tag was not in its own fragment.
    OpenToggle(T),
    /// A lone closing tag ending at this byte offset.
    Close(usize),
}

/// A node that can take part in toggle reassembly.
pub trait ToggleSibling: Sized {
    fn is_toggle(&self) -> bool;
    /// Appends `child` and widens this node to cover it.
    fn absorb(&mut self, child: Self);
    /// Widens this node to end at `end`.
    fn extend_to(&mut self, end: usize);
}

/// Second pass over converted siblings: folds open toggles and their
/// following siblings into nested toggles.
pub fn reassemble<T: ToggleSibling>(fragments: Vec<Fragment<T>>, mode: ToggleReassembly) -> Vec<T> {
    match mode {
        ToggleReassembly::UntilNextToggle => until_next_toggle(fragments),
        ToggleReassembly::MatchClosingTag => match_closing_tag(fragments),
    }
}

fn until_next_toggle<T: ToggleSibling>(fragments: Vec<Fragment<T>>) -> Vec<T> {
    let mut out = Vec::with_capacity(fragments.len());
    let mut current: Option<T> = None;

    for fragment in fragments {
        match fragment {
            Fragment::OpenToggle(toggle) => {
                out.extend(current.replace(toggle));
            }
            Fragment::Item(item) if item.is_toggle() => {
                out.extend(current.take());
                out.push(item);
            }
            Fragment::Item(item) => match current.as_mut() {
                Some(toggle) => toggle.absorb(item),
                None => out.push(item),
            },
            Fragment::Close(_) => {}
        }
    }

    out.extend(current);
    out
}

fn match_closing_tag<T: ToggleSibling>(fragments: Vec<Fragment<T>>) -> Vec<T> {
    let mut out = Vec::with_capacity(fragments.len());
    let mut open: Vec<T> = Vec::new();

    fn attach<T: ToggleSibling>(node: T, open: &mut [T], out: &mut Vec<T>) {
        match open.last_mut() {
            Some(parent) => parent.absorb(node),
            None => out.push(node),
        }
    }

    for fragment in fragments {
        match fragment {
            Fragment::OpenToggle(toggle) => open.push(toggle),
            Fragment::Item(item) => attach(item, &mut open, &mut out),
            Fragment::Close(end) => {
                if let Some(mut toggle) = open.pop() {
                    toggle.extend_to(end);
                    attach(toggle, &mut open, &mut out);
                } else {
                    log::debug!("dropping unmatched </details> ending at {end}");
                }
            }
        }
    }

    // unterminated toggles keep whatever followed them
    while let Some(toggle) = open.pop() {
        attach(toggle, &mut open, &mut out);
    }
    out
}
