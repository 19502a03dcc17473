use crate::blocks::SourceRange;

/// A reference to a single line of the source with its byte range.
#[derive(Debug, Clone, Copy)]
pub struct LineRef<'a> {
    /// Byte range of this line (includes the newline if present).
    pub range: SourceRange,
    /// The line text, newline included.
    pub text: &'a str,
}

impl LineRef<'_> {
    /// Line text without the trailing `\n` / `\r\n`.
    pub fn content(&self) -> &str {
        self.text.trim_end_matches(['\r', '\n'])
    }
}

/// Returns an iterator over lines with their byte ranges.
///
/// Newline characters are preserved so ranges tile the input exactly.
pub fn lines_with_spans(text: &str) -> impl Iterator<Item = LineRef<'_>> + '_ {
    let mut offset = 0usize;
    text.split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        LineRef {
            range: SourceRange::new(start, offset),
            text: line,
        }
    })
}
