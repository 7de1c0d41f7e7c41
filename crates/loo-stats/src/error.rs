use thiserror::Error;

use loo_store::StoreError;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type StatsResult<T> = Result<T, StatsError>;
