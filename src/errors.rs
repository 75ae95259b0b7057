use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Config(String),
    #[error("geocoder error: {0}")]
    Provider(String),
}

impl AppError {
    /// Rate-limit and transport failures form a separate failure channel
    /// from row-level bugs; the per-record boundary logs them differently.
    pub fn is_provider(&self) -> bool {
        matches!(self, AppError::Provider(_) | AppError::Http(_))
    }
}
