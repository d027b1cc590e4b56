//! Execution contexts for jobs.
//!
//! Both dispatchers drive the same [`JobRunner`]; they only decide where the
//! run happens.

use async_trait::async_trait;
use llm_eval_core::{CoreError, Dispatcher, JobId, Result};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::JobFatalError;
use crate::runner::{JobRunner, RunOutcome};

fn into_core(error: JobFatalError) -> CoreError {
    match error {
        JobFatalError::Persistence(e) => e,
        JobFatalError::InvalidState(message) => CoreError::InvalidState(message),
        JobFatalError::Configuration(message) => CoreError::Internal(message),
    }
}

/// Runs the job in the caller's task; `submit` returns once the job is terminal.
#[derive(Clone)]
pub struct InlineDispatcher {
    runner: JobRunner,
}

impl InlineDispatcher {
    pub fn new(runner: JobRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Dispatcher for InlineDispatcher {
    async fn submit(&self, job_id: JobId) -> Result<()> {
        let outcome = self.runner.run(job_id).await.map_err(into_core)?;
        debug!(job_id = %job_id, outcome = ?outcome, "Inline run finished");
        Ok(())
    }
}

/// What the worker did with one queued job. An `Err` means the job could not
/// be moved to a terminal state and will stay `Pending` or `Processing`.
#[derive(Debug)]
pub struct WorkerReport {
    pub job_id: JobId,
    pub result: std::result::Result<RunOutcome, JobFatalError>,
}

/// Queues job ids for a background worker. When the queue is full or the
/// worker has gone away the job runs inline instead.
pub struct QueuedDispatcher {
    sender: mpsc::Sender<JobId>,
    inline: InlineDispatcher,
}

impl QueuedDispatcher {
    pub fn new(sender: mpsc::Sender<JobId>, runner: JobRunner) -> Self {
        Self {
            sender,
            inline: InlineDispatcher::new(runner),
        }
    }

    /// Starts a worker on the current runtime with a queue of `capacity` jobs.
    pub fn spawn(runner: JobRunner, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(runner.clone(), receiver, None));
        (Self::new(sender, runner), worker)
    }

    /// Like [`QueuedDispatcher::spawn`], also returning one [`WorkerReport`]
    /// per job the worker picked up.
    pub fn spawn_reporting(
        runner: JobRunner,
        capacity: usize,
    ) -> (Self, JoinHandle<()>, mpsc::UnboundedReceiver<WorkerReport>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (reports, report_receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(runner.clone(), receiver, Some(reports)));
        (Self::new(sender, runner), worker, report_receiver)
    }
}

#[async_trait]
impl Dispatcher for QueuedDispatcher {
    async fn submit(&self, job_id: JobId) -> Result<()> {
        match self.sender.try_send(job_id) {
            Ok(()) => {
                debug!(job_id = %job_id, "Job queued");
                Ok(())
            }
            Err(TrySendError::Full(job_id)) => {
                warn!(job_id = %job_id, "Job queue is full, running inline");
                self.inline.submit(job_id).await
            }
            Err(TrySendError::Closed(job_id)) => {
                warn!(job_id = %job_id, "Job queue is closed, running inline");
                self.inline.submit(job_id).await
            }
        }
    }
}

/// Consumes queued ids one at a time until every sender is dropped. When
/// `reports` is set, the result of every run is sent there.
pub async fn run_worker(
    runner: JobRunner,
    mut receiver: mpsc::Receiver<JobId>,
    reports: Option<mpsc::UnboundedSender<WorkerReport>>,
) {
    info!("Job worker started");
    while let Some(job_id) = receiver.recv().await {
        let result = runner.run(job_id).await;
        match &result {
            Ok(RunOutcome::Finished(status)) => {
                debug!(job_id = %job_id, status = %status, "Queued job finished")
            }
            Ok(outcome) => debug!(job_id = %job_id, outcome = ?outcome, "Queued job skipped"),
            Err(e) => error!(job_id = %job_id, error = %e, "Queued job could not be run"),
        }

        if let Some(reports) = &reports {
            if reports.send(WorkerReport { job_id, result }).is_err() {
                debug!(job_id = %job_id, "Report receiver dropped");
            }
        }
    }
    info!("Job worker stopped");
}
