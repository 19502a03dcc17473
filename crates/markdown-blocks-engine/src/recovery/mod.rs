//! Bounded recovery after a failed parse.
//!
//! The recovery layer only knows the [`DocumentParser`] interface; the engine
//! hands in whatever parser (and strategy) failed.
//!
//! Attempts, in order, each counted against `max_retries`:
//!
//! 1. apply [`fix_common_issues`] and parse again
//! 2. for documents over [`CHUNKED_RECOVERY_THRESHOLD`], parse blank-line
//!    aligned chunks independently; any failing chunk fails the attempt
//!
//! Block ranges of a recovered result refer to the repaired text, which is
//! returned alongside them.

mod fixes;

use serde::{Deserialize, Serialize};

use crate::blocks::Block;
use crate::error::EngineError;
use crate::performance::{BATCH_TARGET_BYTES, parse_batched};

pub use fixes::fix_common_issues;

/// Documents above this size get the chunked attempt.
pub const CHUNKED_RECOVERY_THRESHOLD: usize = 1024 * 1024;

/// The parser interface recovery retries through.
pub trait DocumentParser: Sync {
    fn parse_document(&self, text: &str) -> Result<Vec<Block>, EngineError>;
}

impl<F> DocumentParser for F
where
    F: Fn(&str) -> Result<Vec<Block>, EngineError> + Sync,
{
    fn parse_document(&self, text: &str) -> Result<Vec<Block>, EngineError> {
        self(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecoveryOptions {
    pub enable_recovery: bool,
    pub max_retries: u32,
    pub chunk_large_documents: bool,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            enable_recovery: true,
            max_retries: 2,
            chunk_large_documents: true,
        }
    }
}

/// A successful recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub blocks: Vec<Block>,
    /// The text `blocks` were parsed from.
    pub text: String,
    /// Total parse attempts, the failed original included.
    pub attempts: u32,
}

pub struct Recovery<'a> {
    options: &'a RecoveryOptions,
}

impl<'a> Recovery<'a> {
    pub fn new(options: &'a RecoveryOptions) -> Self {
        Self { options }
    }

    /// Retries after `first_error`, which the caller got from its own parse
    /// of `text`. Exhaustion yields a parse error carrying the attempt count
    /// and the last underlying message.
    pub fn run(
        &self,
        text: &str,
        parser: &dyn DocumentParser,
        first_error: EngineError,
    ) -> Result<Recovered, EngineError> {
        if !first_error.is_recoverable() || !self.options.enable_recovery {
            return Err(first_error);
        }

        let mut attempts = 1u32;
        let mut last = first_error;
        let repaired = fix_common_issues(text);

        if attempts <= self.options.max_retries {
            attempts += 1;
            match parser.parse_document(&repaired) {
                Ok(blocks) => {
                    log::info!("parse recovered after textual repairs ({attempts} attempts)");
                    return Ok(Recovered {
                        blocks,
                        text: repaired,
                        attempts,
                    });
                }
                Err(err) => {
                    log::debug!("repaired parse failed: {err}");
                    last = err;
                }
            }
        }

        if attempts <= self.options.max_retries
            && self.options.chunk_large_documents
            && repaired.len() > CHUNKED_RECOVERY_THRESHOLD
        {
            attempts += 1;
            match parse_batched(&repaired, BATCH_TARGET_BYTES, |chunk| {
                parser.parse_document(chunk)
            }) {
                Ok(blocks) => {
                    log::info!("parse recovered by chunking ({attempts} attempts)");
                    return Ok(Recovered {
                        blocks,
                        text: repaired,
                        attempts,
                    });
                }
                Err(err) => {
                    log::debug!("chunked parse failed: {err}");
                    last = err;
                }
            }
        }

        let position = match &last {
            EngineError::Parse { position, .. } => *position,
            _ => None,
        };
        Err(EngineError::Parse {
            message: last.message().to_string(),
            attempts,
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BlockContent, SourceRange};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn one_block(text: &str) -> Vec<Block> {
        vec![Block::new(
            BlockContent::Paragraph { text: text.into() },
            SourceRange::new(0, text.len()),
        )]
    }

    /// Fails until the text contains `# `.
    fn needs_heading_space(text: &str) -> Result<Vec<Block>, EngineError> {
        if text.contains("# ") {
            Ok(one_block(text))
        } else {
            Err(EngineError::parse("heading without space"))
        }
    }

    #[test]
    fn textual_repair_recovers() {
        let options = RecoveryOptions::default();
        let recovered = Recovery::new(&options)
            .run("#Title", &needs_heading_space, EngineError::parse("first"))
            .unwrap();
        assert_eq!(recovered.text, "# Title");
        assert_eq!(recovered.attempts, 2);
    }

    #[test]
    fn disabled_recovery_returns_the_first_error() {
        let options = RecoveryOptions {
            enable_recovery: false,
            ..RecoveryOptions::default()
        };
        let err = Recovery::new(&options)
            .run("#Title", &needs_heading_space, EngineError::parse("first"))
            .unwrap_err();
        assert_eq!(err, EngineError::parse("first"));
    }

    #[test]
    fn non_parse_errors_are_not_retried() {
        let options = RecoveryOptions::default();
        let err = Recovery::new(&options)
            .run("x", &needs_heading_space, EngineError::invalid_input("too big"))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { .. }));
    }

    #[test]
    fn exhaustion_reports_attempts_and_last_message() {
        let calls = AtomicU32::new(0);
        let always_fails = |_: &str| -> Result<Vec<Block>, EngineError> {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::parse(format!("failure {n}")))
        };
        let options = RecoveryOptions::default();
        let err = Recovery::new(&options)
            .run("small doc", &always_fails, EngineError::parse("first"))
            .unwrap_err();
        // small documents skip the chunked attempt
        assert_eq!(
            err,
            EngineError::Parse {
                message: "failure 0".into(),
                attempts: 2,
                position: None,
            }
        );
    }

    #[test]
    fn large_documents_get_the_chunked_attempt() {
        let text = "paragraph\n\n".repeat(CHUNKED_RECOVERY_THRESHOLD / 10);
        // fails on the whole document, succeeds on anything chunk-sized
        let size_limited = |t: &str| -> Result<Vec<Block>, EngineError> {
            if t.len() > CHUNKED_RECOVERY_THRESHOLD {
                Err(EngineError::parse("too large"))
            } else {
                Ok(one_block(t))
            }
        };
        let options = RecoveryOptions::default();
        let recovered = Recovery::new(&options)
            .run(&text, &size_limited, EngineError::parse("first"))
            .unwrap();
        assert_eq!(recovered.attempts, 3);
        assert!(recovered.blocks.len() > 1);
    }

    #[test]
    fn retry_budget_is_respected() {
        let text = "x\n\n".repeat(CHUNKED_RECOVERY_THRESHOLD);
        let calls = AtomicU32::new(0);
        let counting = |_: &str| -> Result<Vec<Block>, EngineError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::parse("no"))
        };
        let options = RecoveryOptions {
            max_retries: 1,
            ..RecoveryOptions::default()
        };
        let err = Recovery::new(&options)
            .run(&text, &counting, EngineError::parse("first"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Parse { attempts: 2, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
