//! Streaming inference client
//!
//! Wraps an [`InferenceProvider`] and turns its raw events into an ordered
//! sequence of [`StreamOutcome`]s. Negotiates the probability-detail option per
//! model through the shared [`CapabilityRegistry`].

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use llm_eval_metrics::token_entropy;
use tracing::{debug, warn};

use crate::capability::CapabilityRegistry;
use crate::config::InferenceConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::groq::GroqProvider;
use crate::models::KNOWN_MODELS;
use crate::provider::{InferenceProvider, ProviderEvent, ProviderEventStream, ProviderRequest};
use crate::types::{GenerationRequest, StreamOutcome, TokenEvent};

/// Re-issues after a capability rejection, per call.
pub const MAX_CAPABILITY_RETRIES: u32 = 1;

/// Log-probability assumed for a token the provider reported none for.
pub const FALLBACK_LOG_PROB: f64 = -0.1;

pub type TokenStream = BoxStream<'static, StreamOutcome>;

/// Client handing out one lazy token stream per generation call.
#[derive(Clone)]
pub struct StreamingInferenceClient {
    provider: Arc<dyn InferenceProvider>,
    registry: Arc<CapabilityRegistry>,
}

impl std::fmt::Debug for StreamingInferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingInferenceClient")
            .field("provider", &self.provider.name())
            .field("registry", &self.registry)
            .finish()
    }
}

impl StreamingInferenceClient {
    pub fn new(provider: Arc<dyn InferenceProvider>, registry: Arc<CapabilityRegistry>) -> Self {
        Self { provider, registry }
    }

    /// Builds a client on the HTTP provider.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::Configuration`] when the credential is missing.
    pub fn from_config(
        config: &InferenceConfig,
        registry: Arc<CapabilityRegistry>,
    ) -> InferenceResult<Self> {
        let provider = GroqProvider::new(config)?;
        Ok(Self::new(Arc::new(provider), registry))
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn supports_probability_detail(&self, model: &str) -> bool {
        self.registry.supports_probability_detail(model)
    }

    pub fn available_models(&self) -> Vec<String> {
        KNOWN_MODELS.iter().map(|m| m.to_string()).collect()
    }

    /// Starts a generation. Nothing is sent until the stream is first polled.
    ///
    /// The stream yields `Token`s in order and ends with exactly one `Done` or
    /// `Error`. A capability rejection from the provider before the first token
    /// is recovered by re-issuing the request without probability detail.
    pub fn stream(&self, request: GenerationRequest) -> TokenStream {
        let driver = StreamDriver {
            provider: Arc::clone(&self.provider),
            registry: Arc::clone(&self.registry),
            request,
            phase: Phase::Connect,
            next_index: 0,
            retries: 0,
        };

        stream::unfold(driver, |mut driver| async move {
            driver.next_outcome().await.map(|outcome| (outcome, driver))
        })
        .boxed()
    }
}

enum Phase {
    Connect,
    Streaming {
        events: ProviderEventStream,
        detail: bool,
        pending_done: bool,
    },
    Finished,
}

struct StreamDriver {
    provider: Arc<dyn InferenceProvider>,
    registry: Arc<CapabilityRegistry>,
    request: GenerationRequest,
    phase: Phase,
    next_index: usize,
    retries: u32,
}

impl StreamDriver {
    async fn next_outcome(&mut self) -> Option<StreamOutcome> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Finished => return None,
                Phase::Connect => {
                    let detail = self.registry.supports_probability_detail(&self.request.model);
                    let request = self.provider_request(detail);
                    debug!(
                        model = %request.model,
                        probability_detail = detail,
                        attempt = self.retries + 1,
                        "Starting generation stream"
                    );

                    match self.provider.open_stream(&request).await {
                        Ok(events) => {
                            self.phase = Phase::Streaming {
                                events,
                                detail,
                                pending_done: false,
                            };
                        }
                        Err(e) => {
                            if let Some(outcome) = self.handle_failure(e, detail) {
                                return Some(outcome);
                            }
                        }
                    }
                }
                Phase::Streaming {
                    mut events,
                    detail,
                    pending_done,
                } => {
                    if pending_done {
                        return Some(StreamOutcome::Done);
                    }

                    match events.next().await {
                        None => return Some(StreamOutcome::Done),
                        Some(Err(e)) => {
                            if let Some(outcome) = self.handle_failure(e, detail) {
                                return Some(outcome);
                            }
                        }
                        Some(Ok(event)) => {
                            let finished = event.finish_reason.is_some();
                            match self.token_from(event) {
                                Some(token) => {
                                    self.phase = Phase::Streaming {
                                        events,
                                        detail,
                                        pending_done: finished,
                                    };
                                    return Some(StreamOutcome::Token(token));
                                }
                                None if finished => return Some(StreamOutcome::Done),
                                None => {
                                    self.phase = Phase::Streaming {
                                        events,
                                        detail,
                                        pending_done: false,
                                    };
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Decides between a transparent re-issue and a terminal error. Leaves
    /// `phase` at `Connect` when retrying.
    fn handle_failure(&mut self, error: InferenceError, detail: bool) -> Option<StreamOutcome> {
        let recoverable = detail
            && error.is_capability_rejection()
            && self.next_index == 0
            && self.retries < MAX_CAPABILITY_RETRIES;

        if !recoverable {
            return Some(StreamOutcome::Error {
                message: error.to_string(),
            });
        }

        let model = self.request.model.clone();
        self.registry.mark_unsupported(&model);
        self.retries += 1;
        warn!(
            model = %model,
            error = %error,
            "Model rejected probability detail, retrying without it"
        );
        metrics::counter!("inference_capability_fallbacks_total", "model" => model).increment(1);

        self.phase = Phase::Connect;
        None
    }

    fn token_from(&mut self, event: ProviderEvent) -> Option<TokenEvent> {
        let text = event.delta_text.filter(|t| !t.is_empty())?;
        let log_prob = event.log_prob.unwrap_or(FALLBACK_LOG_PROB);
        let entropy = token_entropy(log_prob, event.alternative_log_probs.as_deref());

        let token = TokenEvent {
            index: self.next_index,
            text,
            log_prob,
            entropy,
        };
        self.next_index += 1;
        Some(token)
    }

    fn provider_request(&self, probability_detail: bool) -> ProviderRequest {
        ProviderRequest {
            system_prompt: self.request.system_prompt.clone(),
            user_prompt: self.request.user_prompt.clone(),
            model: self.request.model.clone(),
            temperature: self.request.temperature,
            max_tokens: self.request.max_tokens,
            top_p: self.request.top_p,
            probability_detail,
        }
    }
}
