use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use llm_eval_core::{CoreError, EvaluationJob, JobId, JobStore, JobSummary, Result};

/// Process-local store. Each record is replaced whole under its shard lock, so
/// readers never observe a half-applied update.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<JobId, EvaluationJob>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: &EvaluationJob) -> Result<JobId> {
        match self.jobs.entry(job.id) {
            Entry::Occupied(_) => Err(CoreError::AlreadyExists(format!("job {}", job.id))),
            Entry::Vacant(slot) => {
                slot.insert(job.clone());
                Ok(job.id)
            }
        }
    }

    async fn get(&self, id: &JobId) -> Result<Option<EvaluationJob>> {
        Ok(self.jobs.get(id).map(|job| job.value().clone()))
    }

    async fn update(&self, job: &EvaluationJob) -> Result<()> {
        match self.jobs.get_mut(&job.id) {
            Some(mut existing) => {
                *existing = job.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("job {}", job.id))),
        }
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<JobSummary>> {
        let mut summaries: Vec<JobSummary> = self
            .jobs
            .iter()
            .map(|entry| JobSummary::from(entry.value()))
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        Ok(summaries.into_iter().skip(offset).take(limit).collect())
    }
}
