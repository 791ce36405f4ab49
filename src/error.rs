use thiserror::Error;

use crate::job::JobId;

#[derive(Debug, Error)]
pub enum RotorError {
    #[error("Invalid resources: {0}")]
    InvalidResources(String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Unknown job: {0}")]
    UnknownJob(JobId),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T, E = RotorError> = std::result::Result<T, E>;
