use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Client input problem. The message is returned to the caller verbatim.
    #[error("{0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
    /// The generative-language service failed or answered with something unusable.
    #[error("External API error: {0}")]
    External(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(anyhow::Error::new(err).context("JSON serialization failed"))
    }
}

impl AppError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
