use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Key-value store error: {0}")]
    StoreError(String),

    #[error("Serialization error for key {0}: {1}")]
    SerializationError(String, String),

    #[error("Invalid timestamp stored under {0}: {1}")]
    InvalidTimestamp(String, String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}
