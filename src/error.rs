//! Error types for lineproto-stream.

use thiserror::Error;

/// Error type for lineproto-stream operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading from the character source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream is not valid UTF-8.
    #[error("Invalid UTF-8 sequence at byte offset {offset}")]
    InvalidUtf8 {
        /// Offset of the first byte of the malformed sequence.
        offset: u64,
    },

    /// A line violated the Line Protocol grammar.
    ///
    /// Only surfaced in [`ErrorMode::FailFast`](crate::config::ErrorMode::FailFast);
    /// the default mode skips the line instead.
    #[error("Syntax error on line {line}: {message}")]
    Syntax {
        /// 1-based line number of the offending line.
        line: u64,
        /// Description of what was wrong.
        message: String,
    },

    /// Failed to parse a numeric field value or timestamp.
    #[error("Failed to parse value: {message}")]
    Parse {
        /// Description of what failed to parse.
        message: String,
    },

    /// A point was assembled from incomplete or invalid parts.
    #[error("Invalid point: {0}")]
    Builder(String),

    /// `next_point` was called without a successful `has_next`.
    #[error("No point available; call has_next() first")]
    NoSuchElement,

    /// The background parsing task failed.
    #[error("Parser task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias for lineproto-stream operations.
pub type Result<T> = std::result::Result<T, Error>;
