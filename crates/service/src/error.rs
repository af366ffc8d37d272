//! Application-level error: what a service call can fail with.

use thiserror::Error;

use bookstore_core::DomainError;
use bookstore_infra::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Business rule rejection (duplicate member, not enough stock, ...).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The backing store failed; the unit of work was discarded.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// The domain error, if this is a business rule rejection.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            ServiceError::Store(_) => None,
        }
    }
}
