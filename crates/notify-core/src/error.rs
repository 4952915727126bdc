//! Error types for the notification pipeline
//!
//! Only [`NotifyError`] crosses the public API. Decode and directory failures
//! have their own types because the pipeline absorbs them locally: a bad
//! stream message is logged and dropped, a failed lookup degrades the
//! enrichment result to "absent".

use thiserror::Error;

/// Errors surfaced by client setup and configuration
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<config::ConfigError> for NotifyError {
    fn from(err: config::ConfigError) -> Self {
        NotifyError::Config(err.to_string())
    }
}

/// A stream message that could not be turned into an [`InboundEvent`](crate::stream::InboundEvent)
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("Message has no eventType discriminant")]
    MissingEventType,

    #[error("Invalid '{kind}' payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Directory lookup failures. Callers treat every variant as "not found".
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unexpected status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
