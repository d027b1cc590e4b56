#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use llm_eval_core::{
    CoreError, EvaluationItem, EvaluationJob, JobId, JobStatus, JobStore, JobSummary,
    MetricConfig, NewEvaluationJob, Result,
};
use llm_eval_inference::{
    CapabilityRegistry, InferenceError, InferenceProvider, InferenceResult, ProviderEvent,
    ProviderEventStream, ProviderRequest, StreamingInferenceClient,
};
use llm_eval_storage::InMemoryJobStore;
use llm_eval_workflow::JobRunner;

pub const REJECTION: &str = "logprobs is not supported for this model";

#[derive(Clone)]
pub enum Reply {
    /// Fragments with the log-probability reported when detail is on.
    Tokens(Vec<(&'static str, f64)>),
    /// The stream fails after the given fragments.
    BreaksAfter(Vec<&'static str>, &'static str),
}

/// Provider answering by user prompt. Unknown prompts echo the prompt.
#[derive(Default)]
pub struct FakeProvider {
    replies: HashMap<String, Reply>,
    rejects_detail: bool,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, prompt: &str, reply: Reply) -> Self {
        self.replies.insert(prompt.to_string(), reply);
        self
    }

    pub fn rejecting_detail(mut self) -> Self {
        self.rejects_detail = true;
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceProvider for FakeProvider {
    async fn open_stream(&self, request: &ProviderRequest) -> InferenceResult<ProviderEventStream> {
        self.requests.lock().unwrap().push(request.clone());

        if self.rejects_detail && request.probability_detail {
            return Err(InferenceError::Provider {
                status: 400,
                message: REJECTION.to_string(),
            });
        }

        let detail = request.probability_detail;
        let reply = self
            .replies
            .get(&request.user_prompt)
            .cloned()
            .unwrap_or_else(|| Reply::Tokens(vec![("echo", -0.5)]));

        let events: Vec<InferenceResult<ProviderEvent>> = match reply {
            Reply::Tokens(tokens) => tokens
                .into_iter()
                .map(|(text, lp)| {
                    let event = ProviderEvent::text(text);
                    Ok(if detail { event.with_log_prob(lp) } else { event })
                })
                .chain(std::iter::once(Ok(ProviderEvent::finished("stop"))))
                .collect(),
            Reply::BreaksAfter(texts, message) => texts
                .into_iter()
                .map(|text| Ok(ProviderEvent::text(text)))
                .chain(std::iter::once(Err(InferenceError::Provider {
                    status: 500,
                    message: message.to_string(),
                })))
                .collect(),
        };

        Ok(stream::iter(events).boxed())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// In-memory store that fails the n-th `update` call (1-based), or every one,
/// and records every successful write.
pub struct FailingStore {
    inner: InMemoryJobStore,
    fail_on_update: Option<usize>,
    fail_every_update: bool,
    message: String,
    updates: AtomicUsize,
    history: Mutex<Vec<(JobStatus, usize, usize)>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryJobStore::new(),
            fail_on_update: None,
            fail_every_update: false,
            message: String::new(),
            updates: AtomicUsize::new(0),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on_update(mut self, call: usize, message: &str) -> Self {
        self.fail_on_update = Some(call);
        self.message = message.to_string();
        self
    }

    pub fn failing_every_update(mut self, message: &str) -> Self {
        self.fail_every_update = true;
        self.message = message.to_string();
        self
    }

    pub fn error(&self) -> CoreError {
        CoreError::Database(self.message.clone())
    }

    /// `(status, completed_items, results.len())` after each persisted write.
    pub fn history(&self) -> Vec<(JobStatus, usize, usize)> {
        self.history.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobStore for FailingStore {
    async fn create(&self, job: &EvaluationJob) -> Result<JobId> {
        self.inner.create(job).await
    }

    async fn get(&self, id: &JobId) -> Result<Option<EvaluationJob>> {
        self.inner.get(id).await
    }

    async fn update(&self, job: &EvaluationJob) -> Result<()> {
        let call = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every_update || self.fail_on_update == Some(call) {
            return Err(self.error());
        }
        self.inner.update(job).await?;
        self.history
            .lock()
            .unwrap()
            .push((job.status, job.completed_items, job.results.len()));
        Ok(())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<JobSummary>> {
        self.inner.list(limit, offset).await
    }
}

pub fn client(provider: Arc<FakeProvider>) -> StreamingInferenceClient {
    StreamingInferenceClient::new(provider, Arc::new(CapabilityRegistry::empty()))
}

pub fn runner(store: Arc<dyn JobStore>, client: StreamingInferenceClient) -> JobRunner {
    JobRunner::new(store, Arc::new(client))
}

pub fn new_job(model: &str, prompts: &[&str], metric_config: MetricConfig) -> EvaluationJob {
    let inputs = prompts.iter().map(|p| EvaluationItem::new(*p)).collect();
    EvaluationJob::create(NewEvaluationJob::new(model, inputs).with_metric_config(metric_config))
        .unwrap()
}

pub async fn stored_job(store: &dyn JobStore, job: &EvaluationJob) -> JobId {
    store.create(job).await.unwrap()
}
