use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid key length: expected {expected} hex digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unsupported key length {0}: expected 40 or 64 hex digits")]
    UnsupportedLength(usize),

    #[error("unknown hash kind: {0}")]
    UnknownHashKind(String),

    #[error("node index already set to {0}")]
    NodeIndexAlreadySet(u32),
}
