//! Inference error types

use thiserror::Error;

/// Option name the provider uses for per-token probability detail.
pub(crate) const PROBABILITY_DETAIL_OPTION: &str = "logprobs";

#[derive(Error, Debug)]
pub enum InferenceError {
    /// Missing or invalid client configuration; raised before any network call
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The provider answered with an error, either as an HTTP status or in-stream
    #[error("Provider error: {status} - {message}")]
    Provider { status: u16, message: String },

    /// Network or connection error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body could not be decoded as an event stream
    #[error("Stream decode error: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type InferenceResult<T> = Result<T, InferenceError>;

impl InferenceError {
    /// Whether the provider refused the request because of the
    /// probability-detail option rather than for any other reason.
    pub fn is_capability_rejection(&self) -> bool {
        match self {
            InferenceError::Provider { message, .. } => message
                .to_ascii_lowercase()
                .contains(PROBABILITY_DETAIL_OPTION),
            _ => false,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, InferenceError::Configuration(_))
    }
}
