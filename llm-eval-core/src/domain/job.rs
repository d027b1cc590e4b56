use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::config::{GenerationParams, MetricConfig};
use super::ids::JobId;
use crate::error::{CoreError, Result};

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

// ===== Job Status =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Pending -> Processing -> {Completed, Failed}; nothing else.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(CoreError::Validation(format!("unknown job status: {}", other))),
        }
    }
}

// ===== Items =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct EvaluationItem {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default)]
    pub expected_output: Option<String>,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl EvaluationItem {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: default_system_prompt(),
            user_prompt: user_prompt.into(),
            expected_output: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }
}

/// Outcome of one item. Never modified after it is appended to a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemResult {
    pub input_prompt: String,
    pub output: String,
    pub latency_ms: f64,
    pub perplexity: Option<f64>,
    pub passed: bool,
    pub failure_reason: Option<String>,
}

impl ItemResult {
    /// Result recorded when producing the item's output failed outright.
    pub fn failed(input_prompt: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input_prompt: input_prompt.into(),
            output: String::new(),
            latency_ms: 0.0,
            perplexity: None,
            passed: false,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Aggregates written once, on the transition to `Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct JobAggregates {
    pub avg_latency_ms: f64,
    pub pass_rate: f64,
    pub avg_perplexity: Option<f64>,
}

// ===== Job Creation =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct NewEvaluationJob {
    #[validate(length(min = 1, max = 255))]
    #[serde(default = "default_model")]
    pub model: String,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub dataset_name: Option<String>,
    #[validate(nested)]
    pub inputs: Vec<EvaluationItem>,
    #[serde(default)]
    pub metric_config: Option<MetricConfig>,
    #[validate(nested)]
    #[serde(default)]
    pub generation: GenerationParams,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl NewEvaluationJob {
    pub fn new(model: impl Into<String>, inputs: Vec<EvaluationItem>) -> Self {
        Self {
            model: model.into(),
            dataset_name: None,
            inputs,
            metric_config: None,
            generation: GenerationParams::default(),
        }
    }

    pub fn with_dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = Some(name.into());
        self
    }

    pub fn with_metric_config(mut self, config: MetricConfig) -> Self {
        self.metric_config = Some(config);
        self
    }

    pub fn with_generation(mut self, generation: GenerationParams) -> Self {
        self.generation = generation;
        self
    }
}

// ===== Evaluation Job =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationJob {
    pub id: JobId,
    pub status: JobStatus,
    pub model: String,
    pub dataset_name: Option<String>,
    pub metric_config: MetricConfig,
    pub generation: GenerationParams,
    pub inputs: Vec<EvaluationItem>,
    pub results: Vec<ItemResult>,
    pub total_items: usize,
    pub completed_items: usize,
    pub avg_latency_ms: Option<f64>,
    pub avg_perplexity: Option<f64>,
    pub pass_rate: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl EvaluationJob {
    /// Validates the request and builds a `Pending` job.
    pub fn create(request: NewEvaluationJob) -> Result<Self> {
        request.validate()?;
        Ok(Self::pending(request))
    }

    fn pending(request: NewEvaluationJob) -> Self {
        let total_items = request.inputs.len();
        Self {
            id: JobId::new(),
            status: JobStatus::Pending,
            model: request.model,
            dataset_name: request.dataset_name,
            metric_config: request.metric_config.unwrap_or_default(),
            generation: request.generation,
            inputs: request.inputs,
            results: Vec::with_capacity(total_items),
            total_items,
            completed_items: 0,
            avg_latency_ms: None,
            avg_perplexity: None,
            pass_rate: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    fn transition(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidState(format!(
                "job {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(JobStatus::Processing)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// Appends the result for the next item and advances `completed_items`.
    pub fn record_result(&mut self, result: ItemResult) -> Result<()> {
        if self.status != JobStatus::Processing {
            return Err(CoreError::InvalidState(format!(
                "job {} is {}, results can only be recorded while processing",
                self.id, self.status
            )));
        }
        if self.completed_items >= self.total_items {
            return Err(CoreError::InvalidState(format!(
                "job {} already has all {} results",
                self.id, self.total_items
            )));
        }
        self.results.push(result);
        self.completed_items = self.results.len();
        Ok(())
    }

    /// Reverts the last `record_result`, used when its checkpoint was not persisted.
    pub fn discard_last_result(&mut self) -> Option<ItemResult> {
        if self.status != JobStatus::Processing {
            return None;
        }
        let removed = self.results.pop();
        self.completed_items = self.results.len();
        removed
    }

    pub fn complete(&mut self, aggregates: JobAggregates, now: DateTime<Utc>) -> Result<()> {
        self.transition(JobStatus::Completed)?;
        self.avg_latency_ms = Some(aggregates.avg_latency_ms);
        self.pass_rate = Some(aggregates.pass_rate);
        self.avg_perplexity = aggregates.avg_perplexity;
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(JobStatus::Failed)?;
        self.error_message = Some(message.into());
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn progress_percent(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        let percent = self.completed_items as f64 / self.total_items as f64 * 100.0;
        (percent * 10.0).round() / 10.0
    }
}
