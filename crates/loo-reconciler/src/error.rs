use thiserror::Error;

use loo_gate::GateError;
use loo_store::StoreError;
use loo_types::LooId;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("loo not found: {0}")]
    NotFound(LooId),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl From<GateError> for ReconcileError {
    fn from(e: GateError) -> Self {
        Self::Validation(e.to_string())
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
