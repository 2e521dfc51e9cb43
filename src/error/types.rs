use thiserror::Error;

use crate::decode::DecodeError;
use crate::grid::GridError;
use crate::program::PreconditionError;

/// Unified result type for a conversion run.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Errors that abort a conversion run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("grid error: {0}")]
    Grid(#[from] GridError),
    #[error("program rejected: {0}")]
    Precondition(#[from] PreconditionError),
    #[error("line {line} `{text}`: {source}")]
    AtLine {
        line: usize,
        text: String,
        #[source]
        source: Box<ConvertError>,
    },
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Attach the offending source line to an error.
    pub fn at_line(self, line: usize, text: impl Into<String>) -> Self {
        ConvertError::AtLine {
            line,
            text: text.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping line context.
    pub fn root(&self) -> &ConvertError {
        match self {
            ConvertError::AtLine { source, .. } => source.root(),
            other => other,
        }
    }
}
