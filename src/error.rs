use thiserror::Error;

/// Errors surfaced by the service layer to a session.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input; the client is asked to retry the same step.
    #[error("{0}")]
    Invalid(String),

    #[error("{0} not found.")]
    NotFound(String),

    /// Domain rule violation reported as an informational message.
    #[error("{0}")]
    Rejected(String),

    #[error("{0} is unavailable right now")]
    Unavailable(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
