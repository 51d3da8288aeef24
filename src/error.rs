use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// The bulk history fetch failed or timed out. Terminal for the whole
    /// aggregation: the caller gets no partial result.
    #[error("visit source unavailable: {message}")]
    SourceUnavailable { message: String },

    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::history", %message, "visit source unavailable");
        AppError::SourceUnavailable { message }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation { message }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }

    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, AppError::SourceUnavailable { .. })
    }
}
