//! Provider boundary: one streamed chat completion per request.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::InferenceResult;

/// Request as sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub probability_detail: bool,
}

/// One decoded chunk of the provider stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderEvent {
    pub delta_text: Option<String>,
    pub finish_reason: Option<String>,
    pub log_prob: Option<f64>,
    pub alternative_log_probs: Option<Vec<f64>>,
}

impl ProviderEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            delta_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn finished(reason: impl Into<String>) -> Self {
        Self {
            finish_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn with_log_prob(mut self, log_prob: f64) -> Self {
        self.log_prob = Some(log_prob);
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<f64>) -> Self {
        self.alternative_log_probs = Some(alternatives);
        self
    }

    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }
}

pub type ProviderEventStream = BoxStream<'static, InferenceResult<ProviderEvent>>;

#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Issues the request. Rejections before the body starts are returned as
    /// `Err`; failures while reading arrive as `Err` items in the stream.
    async fn open_stream(&self, request: &ProviderRequest) -> InferenceResult<ProviderEventStream>;

    fn name(&self) -> &str;
}
