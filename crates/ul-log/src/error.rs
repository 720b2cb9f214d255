use std::io;
use std::path::PathBuf;

/// Errors produced by log parsing and appending.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// An entry field is missing or malformed.
    #[error("invalid log entry: {0}")]
    InvalidEntry(String),

    /// The first line of the log does not match the header grammar.
    #[error("malformed log header: '{line}'")]
    MalformedHeader { line: String },

    /// A body line is neither ignorable nor a valid entry.
    #[error("not a valid log entry line ({line_no}): '{line}'")]
    MalformedEntryLine { line_no: usize, line: String },

    /// Append attempted on a log that has been closed.
    #[error("log file {} is not open for appending", .0.display())]
    LogClosed(PathBuf),

    /// A durable log was built without a file to bind to.
    #[error("no target directory or base name specified for the log")]
    NoTargetSpecified,

    /// I/O error while reading or writing the log file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the log crate.
pub type LogResult<T> = std::result::Result<T, LogError>;
