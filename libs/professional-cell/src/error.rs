use thiserror::Error;
use tracing::error;

use shared_database::StoreError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum ProfessionalError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ProfessionalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ProfessionalError::NotFound(what),
            other => {
                error!("Store failure in professional cell: {}", other);
                ProfessionalError::Internal(other.to_string())
            }
        }
    }
}

impl From<ProfessionalError> for AppError {
    fn from(err: ProfessionalError) -> Self {
        match err {
            ProfessionalError::NotFound(_) => AppError::NotFound(err.to_string()),
            ProfessionalError::Forbidden(msg) => AppError::Forbidden(msg),
            ProfessionalError::InvalidArgument(msg) => AppError::BadRequest(msg),
            ProfessionalError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
