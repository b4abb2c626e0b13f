use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading vocabulary data.
#[derive(Debug, Error)]
pub enum VocabularyError {
    /// Identifier not of the form `<PREFIX>:<code>`.
    #[error("invalid term id `{0}`: expected <PREFIX>:<code>")]
    InvalidTermId(String),
    /// Malformed input at a given 1-based line.
    #[error("line {line}: {message}")]
    Parse {
        /// Line number in the source file.
        line: usize,
        /// What was wrong.
        message: String,
    },
    /// The source file could not be read.
    #[error("reading {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl VocabularyError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}
