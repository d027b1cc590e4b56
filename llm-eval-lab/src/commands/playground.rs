//! Stream one prompt and show per-token telemetry

use anyhow::{bail, Context as _, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::Cell;
use futures::StreamExt;
use llm_eval_core::{GenerationParams, DEFAULT_SYSTEM_PROMPT};
use llm_eval_inference::{
    GenerationRequest, StreamOutcome, StreamingInferenceClient, TokenEvent, TokenStream,
};
use llm_eval_metrics::{burstiness, perplexity};
use serde::Serialize;
use validator::Validate;

use crate::context::AppContext;
use crate::output::{print_field, print_section, TableDisplay};

#[derive(Debug, Args)]
pub struct StreamArgs {
    /// User prompt
    pub prompt: String,

    /// System prompt
    #[arg(short, long, default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system: String,

    /// Model to stream from (defaults to the configured model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature (0-2)
    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    /// Maximum tokens to generate (1-8192)
    #[arg(long, default_value_t = 1024)]
    pub max_tokens: u32,

    /// Nucleus sampling cutoff (0-1)
    #[arg(long, default_value_t = 1.0)]
    pub top_p: f32,
}

/// One streamed token, rounded for display.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TokenRow {
    pub id: usize,
    pub text: String,
    pub logprob: f64,
    pub entropy: f64,
}

impl From<&TokenEvent> for TokenRow {
    fn from(token: &TokenEvent) -> Self {
        Self {
            id: token.index,
            text: token.text.clone(),
            logprob: round6(token.log_prob),
            entropy: round6(token.entropy),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StreamSummary {
    pub model: String,
    pub text: String,
    pub tokens: Vec<TokenRow>,
    /// Over the unrounded log-probabilities; `None` when no token arrived.
    pub perplexity: Option<f64>,
    pub burstiness: f64,
    pub error: Option<String>,
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Drains the stream, handing each token to `on_token` as it arrives. Stops at
/// the first `Done` or `Error`.
pub async fn consume(
    model: &str,
    mut stream: TokenStream,
    mut on_token: impl FnMut(&TokenRow),
) -> StreamSummary {
    let mut text = String::new();
    let mut tokens = Vec::new();
    let mut log_probs = Vec::new();
    let mut error = None;

    while let Some(outcome) = stream.next().await {
        match outcome {
            StreamOutcome::Token(token) => {
                text.push_str(&token.text);
                log_probs.push(token.log_prob);
                let row = TokenRow::from(&token);
                on_token(&row);
                tokens.push(row);
            }
            StreamOutcome::Done => break,
            StreamOutcome::Error { message } => {
                error = Some(message);
                break;
            }
        }
    }

    StreamSummary {
        model: model.to_string(),
        perplexity: (!log_probs.is_empty()).then(|| perplexity(&log_probs)),
        burstiness: burstiness(&text),
        text,
        tokens,
        error,
    }
}

pub async fn execute(ctx: &AppContext, args: StreamArgs) -> Result<()> {
    let generation = GenerationParams {
        temperature: args.temperature,
        max_tokens: args.max_tokens,
        top_p: args.top_p,
    };
    generation
        .validate()
        .context("Invalid generation parameters")?;

    let model = args.model.unwrap_or_else(|| ctx.config.default_model.clone());
    let client =
        StreamingInferenceClient::from_config(&ctx.config.inference_config(), ctx.registry().clone())?;
    let request = GenerationRequest::new(&model, &args.system, &args.prompt)
        .with_temperature(generation.temperature)
        .with_max_tokens(generation.max_tokens)
        .with_top_p(generation.top_p);

    let live = ctx.output.is_table();
    if live {
        println!(
            "{}",
            format!("{:>5}  {:<28} {:>12} {:>12}", "id", "text", "logprob", "entropy").dimmed()
        );
    }
    let summary = consume(&model, client.stream(request), |row| {
        if live {
            print_token(row);
        }
    })
    .await;

    ctx.output.write(&summary)?;
    if let Some(error) = &summary.error {
        bail!("Stream failed: {}", error);
    }
    Ok(())
}

fn print_token(row: &TokenRow) {
    let text = format!("{:<28}", format!("{:?}", row.text));
    let text = if row.logprob > -0.5 {
        text.green()
    } else if row.logprob > -2.0 {
        text.yellow()
    } else {
        text.red()
    };
    println!(
        "{:>5}  {} {:>12.6} {:>12.6}",
        row.id, text, row.logprob, row.entropy
    );
}

impl TableDisplay for StreamSummary {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::new(&self.model),
            Cell::new(self.tokens.len()),
            Cell::new(
                self.perplexity
                    .map(|p| format!("{:.3}", p))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(format!("{:.3}", self.burstiness)),
        ]
    }

    fn display_single(&self) {
        print_section("Response");
        println!("{}", self.text);

        print_section("Metrics");
        print_field("Model", &self.model);
        print_field("Tokens", &self.tokens.len().to_string());
        print_field(
            "Perplexity",
            &self
                .perplexity
                .map(|p| format!("{:.3}", p))
                .unwrap_or_else(|| "-".to_string()),
        );
        print_field("Burstiness", &format!("{:.3}", self.burstiness));
        if let Some(error) = &self.error {
            print_field("Error", &error.red().to_string());
        }
    }
}
