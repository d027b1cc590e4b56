use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::JobId;
use super::job::{EvaluationJob, ItemResult, JobStatus};

/// Polling view of a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub status: JobStatus,
    pub total_items: usize,
    pub completed_items: usize,
    pub progress_percent: f64,
    pub error_message: Option<String>,
}

impl From<&EvaluationJob> for JobProgress {
    fn from(job: &EvaluationJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            total_items: job.total_items,
            completed_items: job.completed_items,
            progress_percent: job.progress_percent(),
            error_message: job.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub id: JobId,
    pub status: JobStatus,
    pub model: String,
    pub dataset_name: Option<String>,
    pub total_items: usize,
    pub completed_items: usize,
    pub pass_rate: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<&EvaluationJob> for JobSummary {
    fn from(job: &EvaluationJob) -> Self {
        Self {
            id: job.id,
            status: job.status,
            model: job.model.clone(),
            dataset_name: job.dataset_name.clone(),
            total_items: job.total_items,
            completed_items: job.completed_items,
            pass_rate: job.pass_rate,
            avg_latency_ms: job.avg_latency_ms,
            created_at: job.created_at,
        }
    }
}

/// Full report for a job, usually read once it is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub model: String,
    pub dataset_name: Option<String>,

    pub total_items: usize,
    pub passed_items: usize,
    pub failed_items: usize,
    pub pass_rate: f64,

    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub avg_perplexity: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ItemResult>>,
}
