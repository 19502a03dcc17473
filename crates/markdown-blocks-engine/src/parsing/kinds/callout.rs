//! Callout recognition and rendering.
//!
//! A callout is a blockquote whose first line carries either a bracketed
//! admonition marker (`> [!WARNING] Title`) or one of a few emoji prefixes
//! (`> ⚠️ **Warning**`).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::blocks::CalloutKind;

/// Which written form the serializer emits for callouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalloutStyle {
    /// `> [!NOTE] Title`
    #[default]
    Admonition,
    /// `> 📝 **Title**`
    Emoji,
}

static ADMONITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[!([A-Za-z]+)\][+-]?\s*(.*)$").unwrap());

static BOLD_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*(.+?)\*\*\s*(.*)$").unwrap());

/// Emoji prefixes in match order. Variation selectors are optional.
const EMOJI_PREFIXES: &[(&str, CalloutKind)] = &[
    ("📝", CalloutKind::Note),
    ("💡", CalloutKind::Tip),
    ("⚠️", CalloutKind::Warning),
    ("⚠", CalloutKind::Warning),
    ("🚨", CalloutKind::Danger),
    ("❗", CalloutKind::Danger),
    ("ℹ️", CalloutKind::Info),
    ("ℹ", CalloutKind::Info),
];

impl CalloutKind {
    pub fn label(self) -> &'static str {
        match self {
            CalloutKind::Note => "Note",
            CalloutKind::Tip => "Tip",
            CalloutKind::Warning => "Warning",
            CalloutKind::Danger => "Danger",
            CalloutKind::Info => "Info",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            CalloutKind::Note => "📝",
            CalloutKind::Tip => "💡",
            CalloutKind::Warning => "⚠️",
            CalloutKind::Danger => "🚨",
            CalloutKind::Info => "ℹ️",
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            CalloutKind::Note => "NOTE",
            CalloutKind::Tip => "TIP",
            CalloutKind::Warning => "WARNING",
            CalloutKind::Danger => "DANGER",
            CalloutKind::Info => "INFO",
        }
    }

    /// Maps an admonition marker (case-insensitive) to a kind. GitHub's
    /// `IMPORTANT`/`CAUTION` and common aliases are folded in; unknown
    /// markers fall back to a note.
    pub fn from_marker(marker: &str) -> Self {
        match marker.to_ascii_lowercase().as_str() {
            "tip" | "hint" | "success" => CalloutKind::Tip,
            "warning" | "attention" => CalloutKind::Warning,
            "danger" | "caution" | "error" | "bug" | "failure" => CalloutKind::Danger,
            "info" | "important" | "abstract" | "summary" => CalloutKind::Info,
            _ => CalloutKind::Note,
        }
    }
}

/// A callout recognised on the first line of a quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalloutHeader {
    pub kind: CalloutKind,
    pub title: Option<String>,
}

/// Matches the first line of a quote body against the admonition form, then
/// the emoji forms.
pub fn detect(first_line: &str) -> Option<CalloutHeader> {
    if let Some(caps) = ADMONITION_RE.captures(first_line) {
        let kind = CalloutKind::from_marker(&caps[1]);
        return Some(CalloutHeader {
            kind,
            title: non_empty(&caps[2]),
        });
    }

    let line = first_line.trim_start();
    let (emoji, kind) = EMOJI_PREFIXES
        .iter()
        .find(|(emoji, _)| line.starts_with(emoji))?;
    let rest = line[emoji.len()..]
        .trim_start_matches('\u{fe0f}')
        .trim();

    let title = match BOLD_LABEL_RE.captures(rest) {
        Some(caps) => {
            let label = caps[1].trim();
            let trailing = caps[2].trim();
            if label.eq_ignore_ascii_case(kind.label()) && trailing.is_empty() {
                None
            } else if trailing.is_empty() {
                Some(label.to_string())
            } else {
                Some(format!("{label} {trailing}"))
            }
        }
        None => non_empty(rest),
    };

    Some(CalloutHeader { kind: *kind, title })
}

/// Splits a quote body into a detected header and the remaining lines.
pub fn split(body: &str) -> Option<(CalloutHeader, String)> {
    let (first, rest) = match body.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (body, ""),
    };
    let header = detect(first)?;
    Some((header, rest.trim_matches('\n').to_string()))
}

/// Renders the header line (without the `> ` prefix).
pub fn header_line(kind: CalloutKind, title: Option<&str>, style: CalloutStyle) -> String {
    match (style, title) {
        (CalloutStyle::Admonition, Some(title)) => format!("[!{}] {title}", kind.marker()),
        (CalloutStyle::Admonition, None) => format!("[!{}]", kind.marker()),
        (CalloutStyle::Emoji, title) => {
            format!("{} **{}**", kind.emoji(), title.unwrap_or(kind.label()))
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
