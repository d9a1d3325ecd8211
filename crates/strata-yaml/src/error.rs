//! Error types for YAML parsing and emission.

use thiserror::Error;
use yaml_rust2::ScanError;

/// Result type alias for strata-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The input was not valid YAML, or used a YAML feature the document
    /// model cannot represent (aliases, container keys).
    #[error("YAML parse error: {message}")]
    Parse {
        /// What went wrong, with scanner position where available
        message: String,
    },

    /// The value tree could not be rendered as YAML.
    #[error("YAML emit error: {message}")]
    Emit {
        /// What went wrong
        message: String,
    },
}

impl Error {
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }

    pub fn emit(message: impl Into<String>) -> Self {
        Error::Emit {
            message: message.into(),
        }
    }
}

impl From<ScanError> for Error {
    fn from(err: ScanError) -> Self {
        Error::Parse {
            message: err.to_string(),
        }
    }
}
