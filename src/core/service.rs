//! Error type shared by every client operation

use crate::core::registry::RegistryError;
use crate::core::store::StoreError;

/// Main service error type
///
/// Registry failures keep their own message so that transport, status,
/// protocol and registry-reported errors stay distinguishable once they
/// reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    License(String),

    #[error("Packaging failed: {0}")]
    Packaging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl ServiceError {
    /// The registry error behind this failure, if any
    pub fn as_registry_error(&self) -> Option<&RegistryError> {
        match self {
            ServiceError::Registry(e) => Some(e),
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
