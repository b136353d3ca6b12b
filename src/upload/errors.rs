use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Source already queued: {}", .0.display())]
    DuplicateSource(PathBuf),

    #[error("Source file missing: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server rejected upload: status code {status_code}, message: {message}")]
    Application {
        status_code: u16,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Upload was cancelled")]
    Cancelled,

    #[error("Manager shutdown")]
    ManagerShutdown,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadError {
    pub fn application_failure(status_code: u16, message: impl Into<String>) -> Self {
        Self::Application {
            status_code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Error alias
pub type Result<T, E = UploadError> = std::result::Result<T, E>;
