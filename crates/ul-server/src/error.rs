use thiserror::Error;
use ul_types::HexKey;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("hash mismatch: content hashes to {actual}, claimed key is {claimed}")]
    HashMismatch { actual: HexKey, claimed: String },

    #[error("invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] ul_store::StoreError),

    #[error("log error: {0}")]
    Log(#[from] ul_log::LogError),

    #[error("invalid value: {0}")]
    Types(#[from] ul_types::TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
