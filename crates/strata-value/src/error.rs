//! Error types for the document model, placeholder grammar, and path language.

use thiserror::Error;

/// Result type alias for strata-value operations.
pub type Result<T> = std::result::Result<T, ValueError>;

/// Errors raised by parsing or structural access.
///
/// `Syntax` is always a local, non-recoverable authoring error. `Path` means
/// a well-formed path was used against an incompatible structure, e.g. a
/// sequence index into a map. "Not found" is deliberately *not* an error:
/// lookups return `Option` / empty result sets so callers can apply defaults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Malformed placeholder or path text.
    #[error("Syntax error in '{text}': {message}")]
    Syntax {
        /// The offending input
        text: String,
        /// What went wrong
        message: String,
    },

    /// Well-formed path, invalid structural use.
    #[error("Invalid path operation at '{path}': {message}")]
    Path {
        /// The path being evaluated
        path: String,
        /// What went wrong
        message: String,
    },
}

impl ValueError {
    /// Shorthand for a syntax error.
    pub fn syntax(text: impl Into<String>, message: impl Into<String>) -> Self {
        ValueError::Syntax {
            text: text.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a path error.
    pub fn path(path: impl ToString, message: impl Into<String>) -> Self {
        ValueError::Path {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
