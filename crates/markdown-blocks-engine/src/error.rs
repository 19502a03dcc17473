use serde::Serialize;

/// Errors surfaced to callers of the engine.
///
/// Node-level conversion problems never reach this type; they are logged and
/// the offending node is skipped (see [`ConvertError`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EngineError {
    /// Wrong shape, not UTF-8, or over the size ceiling.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Unrecoverable syntactic failure, possibly after recovery attempts.
    #[error("Parse error after {attempts} attempt(s): {message}")]
    Parse {
        message: String,
        attempts: u32,
        position: Option<usize>,
    },

    /// Malformed output or unsupported content at serialize time.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// A block failed a structural invariant check.
    #[error("Validation error at block {index}: {message}")]
    Validation { index: usize, message: String },
}

impl EngineError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            attempts: 1,
            position: None,
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn validation(index: usize, message: impl Into<String>) -> Self {
        Self::Validation {
            index,
            message: message.into(),
        }
    }

    /// Whether the recovery layer may retry after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Message without the variant prefix, used when re-wrapping errors.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput { message }
            | Self::Parse { message, .. }
            | Self::Serialization { message }
            | Self::Validation { message, .. } => message,
        }
    }
}

/// Failure converting a single syntax node into a block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    #[error("node range {start}..{end} is not a valid slice of the source")]
    InvalidRange { start: usize, end: usize },
    #[error("toggle body could not be parsed: {0}")]
    ToggleBody(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_reports_attempts() {
        let err = EngineError::Parse {
            message: "boom".into(),
            attempts: 3,
            position: Some(12),
        };
        assert_eq!(err.to_string(), "Parse error after 3 attempt(s): boom");
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn only_parse_errors_are_recoverable() {
        assert!(EngineError::parse("x").is_recoverable());
        assert!(!EngineError::validation(0, "x").is_recoverable());
        assert!(!EngineError::invalid_input("x").is_recoverable());
        assert!(!EngineError::serialization("x").is_recoverable());
    }

    #[test]
    fn errors_serialize_with_kind_tag() {
        let json = serde_json::to_value(EngineError::validation(4, "empty id")).unwrap();
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["index"], 4);
    }
}
