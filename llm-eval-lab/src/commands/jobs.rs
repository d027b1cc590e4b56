//! Job inspection commands

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use llm_eval_core::JobId;
use llm_eval_workflow::{EvaluationService, InlineDispatcher};

use crate::context::AppContext;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Job ID
    pub id: JobId,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Job ID
    pub id: JobId,

    /// Include per-item results
    #[arg(long)]
    pub results: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Maximum number of jobs to return
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Offset for pagination
    #[arg(short, long, default_value = "0")]
    pub offset: usize,
}

const LIST_HEADERS: &[&str] = &["ID", "Status", "Model", "Dataset", "Items", "Pass rate", "Created"];

/// Read-side service. Nothing is submitted from these commands.
fn service(ctx: &AppContext) -> EvaluationService {
    if !ctx.is_persistent() {
        ctx.output
            .warning("No database_url configured; only jobs from this process are visible.");
    }
    ctx.service(Arc::new(InlineDispatcher::new(ctx.runner())))
}

pub async fn status(ctx: &AppContext, args: StatusArgs) -> Result<()> {
    let service = service(ctx);
    let progress = service.status(&args.id).await?;
    ctx.output.write(&progress)
}

pub async fn report(ctx: &AppContext, args: ReportArgs) -> Result<()> {
    let service = service(ctx);
    let report = service.report(&args.id, args.results).await?;
    ctx.output.write(&report)
}

pub async fn list(ctx: &AppContext, args: ListArgs) -> Result<()> {
    let service = service(ctx);
    let jobs = service.list(args.limit, args.offset).await?;
    ctx.output.write_list(&jobs, LIST_HEADERS)
}
