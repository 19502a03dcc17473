/// Blockquote syntax knowledge.
///
/// All `>`-prefix handling lives here rather than in the converter or the
/// serializer.
pub struct BlockQuote;

impl BlockQuote {
    /// The blockquote prefix character.
    pub const PREFIX: char = '>';

    /// Removes exactly one level of `>` from a line. Lazy continuation lines
    /// (no marker) come back with only leading indentation removed.
    pub fn strip_one_level(line: &str) -> &str {
        let trimmed = line.trim_start_matches(' ');
        match trimmed.strip_prefix(Self::PREFIX) {
            Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
            None => trimmed,
        }
    }

    /// The inner Markdown of a blockquote's source text, one level unwrapped.
    pub fn body(source: &str) -> String {
        let lines: Vec<&str> = source
            .lines()
            .map(Self::strip_one_level)
            .collect::<Vec<_>>();
        let end = lines
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map_or(0, |i| i + 1);
        lines[..end].join("\n")
    }

    /// Prefixes every line of `body` with `> ` (bare `>` for blank lines).
    pub fn wrap(body: &str) -> String {
        body.split('\n')
            .map(|line| {
                if line.trim().is_empty() {
                    Self::PREFIX.to_string()
                } else {
                    format!("{} {line}", Self::PREFIX)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
