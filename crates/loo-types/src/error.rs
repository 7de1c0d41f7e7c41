use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("latitude out of range: {0}")]
    LatitudeOutOfRange(String),

    #[error("longitude out of range: {0}")]
    LongitudeOutOfRange(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
