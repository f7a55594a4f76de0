use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Errors raised by store implementations.
///
/// The lifecycle service never hands these to its callers; they are
/// converted into an [`OutcomeError`](super::OutcomeError) at the service
/// boundary.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device already exists: {0}")]
    DeviceAlreadyExists(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}
