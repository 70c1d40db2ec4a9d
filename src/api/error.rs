use thiserror::Error;

use crate::sync::contracts::SnapshotSourceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid server base url: {0}")]
    InvalidBaseUrl(String),
    #[error("not authorized; check the configured token")]
    Unauthorized,
    #[error("resource not found")]
    NotFound,
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("server unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<ApiError> for SnapshotSourceError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => Self::Unauthorized,
            ApiError::NotFound => Self::NotFound,
            ApiError::Decode(details) => Self::InvalidData(details),
            ApiError::InvalidBaseUrl(details) => Self::Unavailable(details),
            ApiError::Status(code) => Self::Unavailable(format!("status {code}")),
            ApiError::Unavailable(source) => Self::Unavailable(source.to_string()),
        }
    }
}
