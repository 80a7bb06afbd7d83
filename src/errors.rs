// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Evaluation service returned status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Unexpected response structure: {0}")]
    UnexpectedResponse(String),

    #[error("Evaluation was cancelled")]
    Cancelled,

    #[error("Coordinator has shut down")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown language '{0}'")]
    UnknownLanguage(String),
}

impl EvalError {
    /// Cancellation is internal to coalescing and never shown to the user.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, EvalError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
