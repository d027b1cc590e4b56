use async_trait::async_trait;

use crate::domain::{EvaluationJob, JobId, JobSummary};
use crate::error::Result;

/// Persistence boundary for evaluation jobs.
///
/// Implementations must provide atomic single-record reads and updates, and
/// `update` must be durable before it returns: the runner relies on it to
/// checkpoint progress between items.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: &EvaluationJob) -> Result<JobId>;
    async fn get(&self, id: &JobId) -> Result<Option<EvaluationJob>>;
    async fn update(&self, job: &EvaluationJob) -> Result<()>;

    /// Newest first.
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<JobSummary>>;
}

/// Hands a job to an execution context (queued worker or inline).
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn submit(&self, job_id: JobId) -> Result<()>;
}
