use crate::DocId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The storage collaborator failed; the current call is aborted and not retried.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("malformed record {id}: {reason}")]
    MalformedRecord { id: DocId, reason: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    pub fn storage(msg: impl Into<String>) -> Self {
        SearchError::StorageUnavailable(msg.into())
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, SearchError::StorageUnavailable(_))
    }
}

impl From<sled::Error> for SearchError {
    fn from(e: sled::Error) -> Self {
        SearchError::StorageUnavailable(e.to_string())
    }
}

impl From<bincode::Error> for SearchError {
    fn from(e: bincode::Error) -> Self {
        SearchError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(e: serde_json::Error) -> Self {
        SearchError::Serialization(e.to_string())
    }
}
