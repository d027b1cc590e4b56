//! Run an evaluation job from a file

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use clap::Args;
use llm_eval_core::{EvaluationItem, JobId, JobProgress, MetricConfig, NewEvaluationJob};
use llm_eval_workflow::{EvaluationService, QueuedDispatcher, WorkerReport};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::context::AppContext;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Args)]
pub struct RunArgs {
    /// JSON file holding a job request or a bare array of items
    pub file: PathBuf,

    /// Model to evaluate (overrides the file)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Dataset label stored with the job
    #[arg(short, long)]
    pub dataset_name: Option<String>,

    /// Require every output to be valid JSON
    #[arg(long)]
    pub check_json: bool,

    /// Require outputs near this many characters (20% tolerance)
    #[arg(long, value_name = "CHARS")]
    pub check_length: Option<usize>,

    /// Include per-item results in the final report
    #[arg(long)]
    pub results: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JobFile {
    Request(NewEvaluationJob),
    Items(Vec<EvaluationItem>),
}

pub async fn execute(ctx: &AppContext, args: RunArgs) -> Result<()> {
    let request = load_request(&args.file, &args, &ctx.config.default_model)?;
    let total = request.inputs.len() as u64;

    let (dispatcher, worker, mut reports) =
        QueuedDispatcher::spawn_reporting(ctx.runner(), ctx.config.queue_capacity);
    let service = ctx.service(Arc::new(dispatcher));

    let created = service.create_job(request).await?;
    info!(job_id = %created.job_id, "Job submitted");

    let pb = ctx.output.progress_bar(total, "evaluating");
    let waited = wait_for_job(&service, created.job_id, &mut reports, POLL_INTERVAL, |progress| {
        pb.set_position(progress.completed_items as u64)
    })
    .await;
    pb.finish_and_clear();
    let progress = waited?;

    let report = service.report(&created.job_id, args.results).await?;
    ctx.output.write(&report)?;

    drop(service);
    worker.await.context("Evaluation worker panicked")?;

    if let Some(error) = progress.error_message {
        bail!("Job {} failed: {}", progress.job_id, error);
    }
    Ok(())
}

/// Polls until the job is terminal. Fails as soon as the worker reports that
/// it could not run the job, or stops while the job is still open.
async fn wait_for_job(
    service: &EvaluationService,
    job_id: JobId,
    reports: &mut mpsc::UnboundedReceiver<WorkerReport>,
    interval: Duration,
    mut on_progress: impl FnMut(&JobProgress),
) -> Result<JobProgress> {
    let mut tick = tokio::time::interval(interval);
    let mut worker_running = true;

    loop {
        tokio::select! {
            report = reports.recv(), if worker_running => match report {
                Some(WorkerReport { job_id: id, result }) if id == job_id => {
                    let outcome = result
                        .with_context(|| format!("Job {} could not be run", job_id))?;
                    let progress = service.status(&job_id).await?;
                    if !progress.status.is_terminal() {
                        bail!("Job {} was not run: {:?}", job_id, outcome);
                    }
                    on_progress(&progress);
                    return Ok(progress);
                }
                Some(_) => {}
                None => worker_running = false,
            },
            _ = tick.tick() => {
                let progress = service.status(&job_id).await?;
                on_progress(&progress);
                if progress.status.is_terminal() {
                    return Ok(progress);
                }
                if !worker_running {
                    bail!("Evaluation worker stopped before job {} finished", job_id);
                }
            }
        }
    }
}

fn load_request(path: &Path, args: &RunArgs, default_model: &str) -> Result<NewEvaluationJob> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: JobFile = serde_json::from_str(&raw)
        .with_context(|| format!("{} is neither a job request nor a list of items", path.display()))?;
    Ok(build_request(parsed, args, default_model))
}

fn build_request(file: JobFile, args: &RunArgs, default_model: &str) -> NewEvaluationJob {
    let mut request = match file {
        JobFile::Request(request) => request,
        JobFile::Items(items) => NewEvaluationJob::new(default_model, items),
    };

    if let Some(model) = &args.model {
        request.model = model.clone();
    }
    if let Some(name) = &args.dataset_name {
        request.dataset_name = Some(name.clone());
    }
    if args.check_json || args.check_length.is_some() {
        request.metric_config = Some(MetricConfig::from_flags(args.check_json, args.check_length));
    }
    request
}
