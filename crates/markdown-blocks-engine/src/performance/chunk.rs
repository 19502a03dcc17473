/// A slice of a document and where it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub offset: usize,
    pub text: &'a str,
}

/// Splits `text` into chunks of at most about `target` bytes.
///
/// Each cut is placed after the last blank line before the target, else after
/// the last newline, else at the target itself (moved back to a char
/// boundary). Concatenating the chunks gives back `text`.
pub fn chunk_text(text: &str, target: usize) -> Vec<Chunk<'_>> {
    let target = target.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        if text.len() - start <= target {
            chunks.push(Chunk {
                offset: start,
                text: &text[start..],
            });
            break;
        }

        let limit = floor_char_boundary(text, start + target);
        let window = &text[start..limit];
        let cut = window
            .rfind("\n\n")
            .map(|i| i + 2)
            .or_else(|| window.rfind('\n').map(|i| i + 1))
            .filter(|&i| i > 0)
            .unwrap_or(window.len());
        let end = if cut == 0 {
            // target is narrower than the next character
            ceil_char_boundary(text, start + 1)
        } else {
            start + cut
        };

        chunks.push(Chunk {
            offset: start,
            text: &text[start..end],
        });
        start = end;
    }
    chunks
}

/// Fixed-size windows cut only on char boundaries, for feeding a stream.
pub fn windows(text: &str, size: usize) -> impl Iterator<Item = &str> + '_ {
    let size = size.max(1);
    let mut start = 0;
    std::iter::from_fn(move || {
        if start >= text.len() {
            return None;
        }
        let mut end = floor_char_boundary(text, (start + size).min(text.len()));
        if end <= start {
            end = ceil_char_boundary(text, start + 1);
        }
        let window = &text[start..end];
        start = end;
        Some(window)
    })
}

fn floor_char_boundary(text: &str, mut i: usize) -> usize {
    i = i.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(text: &str, mut i: usize) -> usize {
    i = i.min(text.len());
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}
