#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    Backticks,
    Tildes,
}

pub struct CodeFence;

impl CodeFence {
    pub const BACKTICKS: &'static str = "```";
    pub const TILDES: &'static str = "~~~";

    /// Detects a fence opener/closer at the start of a line (indent allowed).
    pub fn sig(line: &str) -> Option<FenceKind> {
        let t = line.trim_end_matches(['\r', '\n']).trim_start();
        if t.starts_with(Self::BACKTICKS) {
            Some(FenceKind::Backticks)
        } else if t.starts_with(Self::TILDES) {
            Some(FenceKind::Tildes)
        } else {
            None
        }
    }

    pub fn closes(kind: FenceKind, sig: Option<FenceKind>) -> bool {
        sig == Some(kind)
    }

    pub fn marker(kind: FenceKind) -> &'static str {
        match kind {
            FenceKind::Backticks => Self::BACKTICKS,
            FenceKind::Tildes => Self::TILDES,
        }
    }

    /// A backtick fence long enough to wrap `code` without being closed early.
    pub fn fence_for(code: &str) -> String {
        let mut longest = 0usize;
        let mut run = 0usize;
        for c in code.chars() {
            if c == '`' {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 0;
            }
        }
        "`".repeat((longest + 1).max(3))
    }
}
