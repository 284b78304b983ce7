use thiserror::Error;

/// Errors surfaced by the document accessor.
///
/// Driver failures are passed through untouched; the other variants cover the
/// few outcomes the accessor itself reports.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),

    #[error("not found")]
    NotFound,

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unsupported operator: {0}")]
    Unsupported(String),
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(e: mongodb::bson::ser::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(e: mongodb::bson::de::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
