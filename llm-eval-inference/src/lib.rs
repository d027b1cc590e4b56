//! Streaming inference client for the evaluation engine.
//!
//! A [`StreamingInferenceClient`] issues one chat completion per call and
//! yields a lazy sequence of [`StreamOutcome`]s with per-token log-probability
//! and entropy. Models that reject the probability-detail option are recorded
//! in a shared [`CapabilityRegistry`] and retried once without it.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use llm_eval_inference::{
//!     CapabilityRegistry, GenerationRequest, InferenceConfig, StreamOutcome,
//!     StreamingInferenceClient,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InferenceConfig::from_env();
//! let client = StreamingInferenceClient::from_config(&config, Arc::new(CapabilityRegistry::new()))?;
//!
//! let request = GenerationRequest::new("llama-3.3-70b-versatile", "You are terse.", "Say hi");
//! let mut stream = client.stream(request);
//! while let Some(outcome) = stream.next().await {
//!     match outcome {
//!         StreamOutcome::Token(token) => print!("{}", token.text),
//!         StreamOutcome::Done => break,
//!         StreamOutcome::Error { message } => return Err(message.into()),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod client;
pub mod config;
pub mod error;
pub mod groq;
pub mod models;
pub mod provider;
pub mod sse;
pub mod types;

pub use capability::{CapabilityRegistry, DEFAULT_UNSUPPORTED_MODELS};
pub use client::{StreamingInferenceClient, TokenStream, FALLBACK_LOG_PROB, MAX_CAPABILITY_RETRIES};
pub use config::{InferenceConfig, API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_TOP_LOGPROBS};
pub use error::{InferenceError, InferenceResult};
pub use groq::GroqProvider;
pub use models::KNOWN_MODELS;
pub use provider::{InferenceProvider, ProviderEvent, ProviderEventStream, ProviderRequest};
pub use types::{GenerationRequest, StreamOutcome, TokenEvent};
