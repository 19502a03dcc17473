use std::sync::LazyLock;

use regex::Regex;

use crate::parsing::kinds::CodeFence;

static HEADING_NO_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^( {0,3}#{1,6})([^#\s])").unwrap());

static BULLET_NO_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*[-*+])(\[[ xX]\])").unwrap());

static TASK_NO_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*[-*+] \[[ xX]\])(\S)").unwrap());

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|?(\s*:?-+:?\s*\|)*\s*:?-+:?\s*\|?\s*$").unwrap());

/// Deterministic repairs for the usual ways hand-written Markdown goes wrong.
///
/// - `#Heading` → `# Heading`
/// - `-[ ]task` / `- [x]task` → `- [ ] task` / `- [x] task`
/// - a table separator row with fewer cells than its header is padded
/// - a code fence left open at the end gets closed
///
/// Lines inside fenced code are left alone.
pub fn fix_common_issues(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut fence = None;

    for line in text.split('\n') {
        let sig = CodeFence::sig(line);
        match fence {
            Some(kind) => {
                if CodeFence::closes(kind, sig) {
                    fence = None;
                }
                out.push(line.to_string());
                continue;
            }
            None if sig.is_some() => {
                fence = sig;
                out.push(line.to_string());
                continue;
            }
            None => {}
        }

        let mut fixed = HEADING_NO_SPACE_RE.replace(line, "$1 $2").into_owned();
        fixed = BULLET_NO_SPACE_RE.replace(&fixed, "$1 $2").into_owned();
        fixed = TASK_NO_SPACE_RE.replace(&fixed, "$1 $2").into_owned();
        if let Some(header) = out.last()
            && let Some(padded) = pad_separator(header, &fixed)
        {
            fixed = padded;
        }
        out.push(fixed);
    }

    let mut fixed = out.join("\n");
    if let Some(kind) = fence {
        if !fixed.ends_with('\n') {
            fixed.push('\n');
        }
        fixed.push_str(CodeFence::marker(kind));
        fixed.push('\n');
    }
    fixed
}

/// Pads `line` with `---` cells when it is a separator row shorter than the
/// header row above it.
fn pad_separator(header: &str, line: &str) -> Option<String> {
    if !line.contains('|') || !header.contains('|') || !SEPARATOR_RE.is_match(line) {
        return None;
    }
    let columns = cells(header).len();
    let mut separator = cells(line);
    if separator.len() >= columns {
        return None;
    }
    separator.resize(columns, "---".to_string());
    Some(format!("| {} |", separator.join(" | ")))
}

/// Cells of a table row, outer pipes dropped. Escaped pipes do not split.
fn cells(row: &str) -> Vec<String> {
    let row = row.trim();
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = match row.strip_suffix('|') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => row,
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in row.chars() {
        match c {
            '|' if !escaped => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
        escaped = c == '\\' && !escaped;
    }
    cells.push(current.trim().to_string());
    cells
}
