//! CLI-specific error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Service(#[from] vsxpub::ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{failed} of {total} publish job(s) failed")]
    PublishFailed { failed: usize, total: usize },
}

impl CliError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Validation(_) => 2,
            _ => 1,
        }
    }
}

impl From<vsxpub::StoreError> for CliError {
    fn from(e: vsxpub::StoreError) -> Self {
        CliError::Service(e.into())
    }
}

impl From<vsxpub::RegistryError> for CliError {
    fn from(e: vsxpub::RegistryError) -> Self {
        CliError::Service(e.into())
    }
}

pub type CliResult<T> = Result<T, CliError>;
