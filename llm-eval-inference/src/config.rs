//! Client configuration
//!
//! Settings for the OpenAI-compatible streaming provider.

use std::time::Duration;

use crate::error::{InferenceError, InferenceResult};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const API_KEY_ENV: &str = "GROQ_API_KEY";
pub const DEFAULT_TOP_LOGPROBS: u8 = 5;

/// Configuration for the inference provider
#[derive(Clone)]
pub struct InferenceConfig {
    /// Credential sent as a bearer token
    pub api_key: Option<String>,

    /// Base URL of the chat-completions API
    pub base_url: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Total request timeout. `None` leaves streams unbounded.
    pub timeout: Option<Duration>,

    /// Number of alternatives requested per token when probability detail is on
    pub top_logprobs: u8,

    /// User agent string
    pub user_agent: String,
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .field("top_logprobs", &self.top_logprobs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            timeout: None,
            top_logprobs: DEFAULT_TOP_LOGPROBS,
            user_agent: format!("llm-eval-inference/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl InferenceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Reads the credential from `GROQ_API_KEY`; all other settings default.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).ok(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_top_logprobs(mut self, top_logprobs: u8) -> Self {
        self.top_logprobs = top_logprobs;
        self
    }

    /// Returns the credential, or a configuration error when it is missing or blank.
    pub fn require_api_key(&self) -> InferenceResult<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(InferenceError::Configuration(format!(
                "{} is required. Set it in the environment or configuration.",
                API_KEY_ENV
            ))),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> InferenceResult<()> {
        self.require_api_key()?;

        url::Url::parse(&self.base_url).map_err(|e| {
            InferenceError::Configuration(format!("invalid base URL {}: {}", self.base_url, e))
        })?;

        if self.top_logprobs == 0 || self.top_logprobs > 20 {
            return Err(InferenceError::Configuration(
                "top_logprobs must be between 1 and 20".to_string(),
            ));
        }

        Ok(())
    }
}
