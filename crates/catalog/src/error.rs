use shared::{
    domain::ProductId,
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("product {0} not found")]
    NotFound(ProductId),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Storage(_) => ErrorCode::Internal,
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(value: CatalogError) -> Self {
        let code = value.code();
        let message = match &value {
            CatalogError::Storage(err) => format!("failed to persist products: {err:#}"),
            other => other.to_string(),
        };
        ApiError::new(code, message)
    }
}
