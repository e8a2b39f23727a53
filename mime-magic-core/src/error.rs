//! Error types for mime-magic-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by the byte-source seam and the match engine.
///
/// Compilation problems are not represented here: the rule compiler reports
/// malformed entries as collected diagnostics and never fails.
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying byte source failed mid-read
    #[error("Source read error: {0}")]
    Source(String),

    /// The caller supplied a source that cannot satisfy the required contract
    /// (e.g. a stream without mark/reset support)
    #[error("Usage error: {0}")]
    Usage(String),

    /// I/O error at the file/mmap seam
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a source read error
    pub fn source(msg: impl Into<String>) -> Self {
        Error::Source(msg.into())
    }

    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Error::Usage(msg.into())
    }
}
