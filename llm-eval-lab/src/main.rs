use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod context;
mod output;

use commands::jobs::{ListArgs, ReportArgs, StatusArgs};
use commands::playground::StreamArgs;
use commands::run::RunArgs;
use config::{AppConfig, LogFormat};
use context::AppContext;
use output::{OutputFormat, OutputWriter};

/// Batch evaluation of LLM outputs
#[derive(Debug, Parser)]
#[command(name = "llm-eval", version, about)]
struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run an evaluation job and print its report
    Run(RunArgs),

    /// Show the progress of a job
    Status(StatusArgs),

    /// Show the aggregate report of a job
    Report(ReportArgs),

    /// List jobs, newest first
    List(ListArgs),

    /// Stream one prompt and print per-token logprob and entropy
    Stream(StreamArgs),

    /// List known models and whether they return logprobs
    Models,
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    init_tracing(&config);

    let output = OutputWriter::new(cli.output, cli.no_color);
    let ctx = AppContext::new(config, output).await?;

    let result = match cli.command {
        Command::Run(args) => commands::run::execute(&ctx, args).await,
        Command::Status(args) => commands::jobs::status(&ctx, args).await,
        Command::Report(args) => commands::jobs::report(&ctx, args).await,
        Command::List(args) => commands::jobs::list(&ctx, args).await,
        Command::Stream(args) => commands::playground::execute(&ctx, args).await,
        Command::Models => commands::models::list(&ctx),
    };

    if let Err(err) = &result {
        ctx.output.error(&format!("{:#}", err));
        std::process::exit(1);
    }
    Ok(())
}
