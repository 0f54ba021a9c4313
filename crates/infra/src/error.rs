use thiserror::Error;

use karatbook_core::DomainError;

use crate::store::StoreError;

/// Failure of an application service call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected by domain rules; nothing was written.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Storage failed while running `step`.
    #[error("{step} failed: {source}")]
    Store {
        step: &'static str,
        #[source]
        source: StoreError,
    },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub(crate) fn store_step(step: &'static str) -> impl FnOnce(StoreError) -> ServiceError {
    move |source| ServiceError::Store { step, source }
}
