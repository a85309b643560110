use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Malformed payload from {address}: {reason}")]
    MalformedPayload { address: String, reason: String },

    #[error("Inconsistent batch for table {table}: {reason}")]
    InconsistentBatch { table: String, reason: String },

    #[error("Database connection error: {0}")]
    ConnectionError(anyhow::Error),

    #[error("Repository error: {0}")]
    RepositoryError(anyhow::Error),
}

impl DomainError {
    pub fn malformed(address: &str, reason: impl Into<String>) -> Self {
        DomainError::MalformedPayload {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}
