//! Error types for the bot deployer

use thiserror::Error;

/// Main error type for the bot deployer
#[derive(Error, Debug)]
pub enum DeployerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("Invalid request: {0}")]
    RequestError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Bot service error: {0}")]
    BotServiceError(String),

    #[error("Permission error: {0}")]
    PermissionError(String),

    #[error("Build failed: {0}")]
    BuildError(String),

    #[error("Callback error: {0}")]
    CallbackError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
