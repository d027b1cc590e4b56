//! OpenAI-compatible chat-completions provider (Groq by default).

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::InferenceConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::provider::{InferenceProvider, ProviderEvent, ProviderEventStream, ProviderRequest};
use crate::sse::SseDecoder;

const DONE_SENTINEL: &str = "[DONE]";

/// Streaming HTTP provider.
#[derive(Debug, Clone)]
pub struct GroqProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    top_logprobs: u8,
}

impl GroqProvider {
    /// Fails with a configuration error when the credential is missing.
    pub fn new(config: &InferenceConfig) -> InferenceResult<Self> {
        config.validate()?;
        let api_key = config.require_api_key()?.to_string();

        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            top_logprobs: config.top_logprobs,
        })
    }

    fn body<'a>(&self, request: &'a ProviderRequest) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: request.top_p,
            stream: true,
            logprobs: request.probability_detail.then_some(true),
            top_logprobs: request.probability_detail.then_some(self.top_logprobs),
        }
    }
}

#[async_trait]
impl InferenceProvider for GroqProvider {
    async fn open_stream(&self, request: &ProviderRequest) -> InferenceResult<ProviderEventStream> {
        debug!(
            model = %request.model,
            probability_detail = request.probability_detail,
            "Opening chat completion stream"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::ACCEPT, "text/event-stream")
            .json(&self.body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.text().await {
                Ok(text) => error_message(&text),
                Err(e) => {
                    warn!(status = status.as_u16(), error = %e, "Failed to read provider error body");
                    format!("unreadable error body: {}", e)
                }
            };
            return Err(InferenceError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();

        Ok(decode_events(body))
    }

    fn name(&self) -> &str {
        "groq"
    }
}

// ===== Wire types =====

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    logprobs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_logprobs: Option<u8>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
    #[serde(default)]
    logprobs: Option<ChoiceLogprobs>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceLogprobs {
    #[serde(default)]
    content: Option<Vec<TokenLogprob>>,
}

#[derive(Debug, Deserialize)]
struct TokenLogprob {
    logprob: f64,
    #[serde(default)]
    top_logprobs: Option<Vec<TopLogprob>>,
}

#[derive(Debug, Deserialize)]
struct TopLogprob {
    logprob: f64,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

/// `error.message` from a JSON error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Maps one `data:` payload. `Ok(None)` means the payload carried nothing
/// (no choices, e.g. a usage-only chunk).
fn parse_chunk(payload: &str) -> InferenceResult<Option<ProviderEvent>> {
    let chunk: ChatCompletionChunk = serde_json::from_str(payload)?;

    if let Some(error) = chunk.error {
        return Err(InferenceError::Provider {
            status: 200,
            message: error.message,
        });
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };

    let token = choice
        .logprobs
        .and_then(|lp| lp.content)
        .and_then(|content| content.into_iter().next());
    let (log_prob, alternative_log_probs) = match token {
        Some(token) => {
            let alternatives = token
                .top_logprobs
                .map(|top| top.into_iter().map(|t| t.logprob).collect::<Vec<_>>())
                .filter(|alts| !alts.is_empty());
            (Some(token.logprob), alternatives)
        }
        None => (None, None),
    };

    Ok(Some(ProviderEvent {
        delta_text: choice.delta.and_then(|d| d.content),
        finish_reason: choice.finish_reason,
        log_prob,
        alternative_log_probs,
    }))
}

// ===== Body decoding =====

struct DecodeState {
    body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    decoder: SseDecoder,
    pending: VecDeque<InferenceResult<ProviderEvent>>,
    finished: bool,
}

impl DecodeState {
    /// Queues parsed payloads. Returns true once the `[DONE]` sentinel is seen.
    fn enqueue(&mut self, payloads: Vec<String>) -> bool {
        for payload in payloads {
            if payload.trim() == DONE_SENTINEL {
                return true;
            }
            match parse_chunk(&payload) {
                Ok(Some(event)) => self.pending.push_back(Ok(event)),
                Ok(None) => {}
                Err(e) => {
                    self.pending.push_back(Err(e));
                    return true;
                }
            }
        }
        false
    }
}

/// Turns an SSE body into provider events. The stream ends at `[DONE]`, at the
/// end of the body, or right after the first error.
pub(crate) fn decode_events(
    body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
) -> ProviderEventStream {
    let state = DecodeState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let payloads = state.decoder.push(&bytes);
                    state.finished = state.enqueue(payloads);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.push_back(Err(InferenceError::Network(e)));
                }
                None => {
                    let trailing = state.decoder.finish().into_iter().collect();
                    state.enqueue(trailing);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}
