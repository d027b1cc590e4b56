use serde::{Deserialize, Serialize};

/// Parameters for one streaming generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 1024,
            top_p: 1.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }
}

/// One generated text fragment with its telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEvent {
    /// Zero-based position in the stream.
    pub index: usize,
    pub text: String,
    pub log_prob: f64,
    pub entropy: f64,
}

/// Item of a generation stream. Exactly one `Done` or `Error` ends the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamOutcome {
    Token(TokenEvent),
    Done,
    Error { message: String },
}

impl StreamOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamOutcome::Token(_))
    }
}
