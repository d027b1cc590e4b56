use std::sync::Arc;

use llm_eval_core::{
    CoreError, Dispatcher, EvaluationJob, EvaluationReport, JobId, JobProgress, JobStore,
    JobSummary, NewEvaluationJob, Result,
};
use llm_eval_metrics::JobAggregator;
use tracing::info;

/// Entry points for creating and inspecting jobs.
#[derive(Clone)]
pub struct EvaluationService {
    store: Arc<dyn JobStore>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl EvaluationService {
    pub fn new(store: Arc<dyn JobStore>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Validates, stores and dispatches a new job. Returns its progress as of
    /// the moment `submit` returned.
    pub async fn create_job(&self, request: NewEvaluationJob) -> Result<JobProgress> {
        let job = EvaluationJob::create(request)?;
        let id = self.store.create(&job).await?;
        info!(job_id = %id, model = %job.model, total_items = job.total_items, "Job created");

        self.dispatcher.submit(id).await?;
        self.status(&id).await
    }

    pub async fn status(&self, id: &JobId) -> Result<JobProgress> {
        self.load(id).await.map(|job| JobProgress::from(&job))
    }

    pub async fn report(&self, id: &JobId, include_results: bool) -> Result<EvaluationReport> {
        let job = self.load(id).await?;
        Ok(JobAggregator::report(&job, include_results))
    }

    pub async fn list(&self, limit: usize, offset: usize) -> Result<Vec<JobSummary>> {
        self.store.list(limit, offset).await
    }

    async fn load(&self, id: &JobId) -> Result<EvaluationJob> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("job {}", id)))
    }
}
