//! Job runner
//!
//! Drives one job from `Pending` to a terminal state. Items run strictly one
//! after another; each result is checkpointed through the [`JobStore`] before
//! the next item starts.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use llm_eval_core::{EvaluationItem, EvaluationJob, ItemResult, JobId, JobStatus, JobStore};
use llm_eval_inference::{
    CapabilityRegistry, GenerationRequest, InferenceConfig, InferenceError, StreamOutcome,
    StreamingInferenceClient,
};
use llm_eval_metrics::{perplexity, JobAggregator, RunTelemetry};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{ItemError, JobFatalError};
use crate::validators::{run_validators, ValidationOutcome};

/// Builds the inference client for a job. Called once per run, after the job
/// has moved to `Processing`.
pub trait ClientFactory: Send + Sync {
    fn client(&self) -> Result<StreamingInferenceClient, InferenceError>;
}

/// Reuses one client for every job.
impl ClientFactory for StreamingInferenceClient {
    fn client(&self) -> Result<StreamingInferenceClient, InferenceError> {
        Ok(self.clone())
    }
}

/// Builds an HTTP-backed client from configuration on each run, sharing one
/// capability registry across runs.
#[derive(Debug, Clone)]
pub struct ConfiguredClientFactory {
    config: InferenceConfig,
    registry: Arc<CapabilityRegistry>,
}

impl ConfiguredClientFactory {
    pub fn new(config: InferenceConfig, registry: Arc<CapabilityRegistry>) -> Self {
        Self { config, registry }
    }
}

impl ClientFactory for ConfiguredClientFactory {
    fn client(&self) -> Result<StreamingInferenceClient, InferenceError> {
        StreamingInferenceClient::from_config(&self.config, Arc::clone(&self.registry))
    }
}

/// Result of [`JobRunner::run`] when no job-level fault escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No job with that id; nothing was changed.
    NotFound,
    /// The job was not `Pending`; nothing was changed.
    NotPending(JobStatus),
    /// The job reached this terminal status and it was persisted.
    Finished(JobStatus),
}

struct ItemRun {
    result: ItemResult,
    latency_ms: f64,
    log_probs: Vec<f64>,
}

#[derive(Clone)]
pub struct JobRunner {
    store: Arc<dyn JobStore>,
    clients: Arc<dyn ClientFactory>,
}

impl JobRunner {
    pub fn new(store: Arc<dyn JobStore>, clients: Arc<dyn ClientFactory>) -> Self {
        Self { store, clients }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Runs the job to completion.
    ///
    /// Item failures are recorded on the job. A job-level fault marks the job
    /// `Failed` (when that write succeeds) and is then reported as
    /// `Ok(Finished(Failed))`; `Err` means even the failure could not be
    /// persisted, or the job could not be loaded.
    pub async fn run(&self, job_id: JobId) -> Result<RunOutcome, JobFatalError> {
        let Some(mut job) = self.store.get(&job_id).await? else {
            warn!(job_id = %job_id, "Job not found, nothing to run");
            return Ok(RunOutcome::NotFound);
        };

        if job.status != JobStatus::Pending {
            warn!(job_id = %job_id, status = %job.status, "Job is not pending, skipping");
            return Ok(RunOutcome::NotPending(job.status));
        }

        info!(
            job_id = %job_id,
            model = %job.model,
            total_items = job.total_items,
            "Starting evaluation job"
        );

        match self.execute(&mut job).await {
            Ok(()) => {
                info!(
                    job_id = %job_id,
                    pass_rate = job.pass_rate.unwrap_or(0.0),
                    avg_latency_ms = job.avg_latency_ms.unwrap_or(0.0),
                    "Evaluation job completed"
                );
                metrics::counter!("eval_jobs_finished_total", "status" => JobStatus::Completed.as_str())
                    .increment(1);
                Ok(RunOutcome::Finished(JobStatus::Completed))
            }
            Err(fatal) => {
                error!(
                    job_id = %job_id,
                    completed_items = job.completed_items,
                    error = %fatal,
                    "Evaluation job failed"
                );
                metrics::counter!("eval_jobs_finished_total", "status" => JobStatus::Failed.as_str())
                    .increment(1);
                self.persist_failure(&mut job, &fatal).await?;
                Ok(RunOutcome::Finished(JobStatus::Failed))
            }
        }
    }

    async fn execute(&self, job: &mut EvaluationJob) -> Result<(), JobFatalError> {
        job.start(Utc::now())
            .map_err(|e| JobFatalError::InvalidState(e.to_string()))?;
        self.store.update(job).await?;

        let client = self
            .clients
            .client()
            .map_err(|e| JobFatalError::Configuration(e.to_string()))?;

        let mut telemetry = RunTelemetry::new();
        for index in 0..job.inputs.len() {
            let item = job.inputs[index].clone();
            let result = match self.process_item(&client, job, &item).await {
                Ok(run) => {
                    telemetry.record(run.latency_ms, &run.log_probs);
                    metrics::histogram!("eval_item_latency_ms").record(run.latency_ms);
                    let outcome = if run.result.passed { "passed" } else { "failed" };
                    metrics::counter!("eval_items_processed_total", "outcome" => outcome).increment(1);
                    run.result
                }
                Err(e) => {
                    error!(job_id = %job.id, item = index, error = %e, "Item failed");
                    metrics::counter!("eval_items_processed_total", "outcome" => "error").increment(1);
                    ItemResult::failed(item.user_prompt.clone(), e.to_string())
                }
            };

            job.record_result(result)
                .map_err(|e| JobFatalError::InvalidState(e.to_string()))?;
            if let Err(e) = self.store.update(job).await {
                job.discard_last_result();
                return Err(e.into());
            }
            debug!(
                job_id = %job.id,
                completed_items = job.completed_items,
                total_items = job.total_items,
                "Checkpointed item"
            );
        }

        let aggregates = JobAggregator::aggregate(&job.results, &telemetry, job.total_items);
        let mut finished = job.clone();
        finished
            .complete(aggregates, Utc::now())
            .map_err(|e| JobFatalError::InvalidState(e.to_string()))?;
        self.store.update(&finished).await?;
        *job = finished;

        Ok(())
    }

    async fn process_item(
        &self,
        client: &StreamingInferenceClient,
        job: &EvaluationJob,
        item: &EvaluationItem,
    ) -> Result<ItemRun, ItemError> {
        let request = GenerationRequest::new(&job.model, &item.system_prompt, &item.user_prompt)
            .with_temperature(job.generation.temperature)
            .with_max_tokens(job.generation.max_tokens)
            .with_top_p(job.generation.top_p);

        let started = Instant::now();
        let mut stream = client.stream(request);
        let mut output = String::new();
        let mut log_probs = Vec::new();

        while let Some(outcome) = stream.next().await {
            match outcome {
                StreamOutcome::Token(token) => {
                    output.push_str(&token.text);
                    log_probs.push(token.log_prob);
                }
                StreamOutcome::Done => break,
                StreamOutcome::Error { message } => return Err(ItemError::Stream(message)),
            }
        }
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let validation = run_validators(&job.metric_config.validators, &output)?;
        let (passed, failure_reason) = match validation {
            ValidationOutcome::Passed => (true, None),
            ValidationOutcome::Failed(reason) => (false, Some(reason)),
        };

        let result = ItemResult {
            input_prompt: item.user_prompt.clone(),
            output,
            latency_ms,
            perplexity: (!log_probs.is_empty()).then(|| perplexity(&log_probs)),
            passed,
            failure_reason,
        };

        Ok(ItemRun {
            result,
            latency_ms,
            log_probs,
        })
    }

    async fn persist_failure(
        &self,
        job: &mut EvaluationJob,
        fatal: &JobFatalError,
    ) -> Result<(), JobFatalError> {
        if let Err(e) = job.fail(fatal.to_string(), Utc::now()) {
            return Err(JobFatalError::InvalidState(e.to_string()));
        }
        if let Err(e) = self.store.update(job).await {
            error!(job_id = %job.id, error = %e, "Could not persist job failure");
            return Err(e.into());
        }
        Ok(())
    }
}
