use std::path::PathBuf;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A key of the wrong width for this store.
    #[error("invalid key {key}: expected {expected} hex digits")]
    InvalidKey { key: String, expected: usize },

    /// A shard bound that is not two hex digits.
    #[error("invalid shard prefix '{0}': expected two hex digits")]
    InvalidShardPrefix(String),

    /// The store root does not exist or is not a directory.
    #[error("store root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
