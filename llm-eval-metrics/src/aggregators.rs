use llm_eval_core::{EvaluationJob, EvaluationReport, ItemResult, JobAggregates};

use crate::calculators::{perplexity, LatencySummary};

/// Latencies and log-probabilities gathered while a job runs.
///
/// Only items that produced a generation are recorded; items that failed
/// before producing output contribute neither a latency nor log-probabilities.
#[derive(Debug, Clone, Default)]
pub struct RunTelemetry {
    latencies: Vec<f64>,
    log_probs: Vec<f64>,
}

impl RunTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, latency_ms: f64, log_probs: &[f64]) {
        self.latencies.push(latency_ms);
        self.log_probs.extend_from_slice(log_probs);
    }

    pub fn latencies(&self) -> &[f64] {
        &self.latencies
    }

    pub fn log_probs(&self) -> &[f64] {
        &self.log_probs
    }
}

pub struct JobAggregator;

impl JobAggregator {
    /// Terminal aggregates for a job.
    ///
    /// Perplexity is computed over the log-probabilities pooled across all
    /// items, not averaged per item. Pass rate is taken over `total_items`.
    pub fn aggregate(
        results: &[ItemResult],
        telemetry: &RunTelemetry,
        total_items: usize,
    ) -> JobAggregates {
        let passed = results.iter().filter(|r| r.passed).count();

        let pass_rate = if total_items == 0 {
            0.0
        } else {
            passed as f64 / total_items as f64
        };

        let avg_perplexity = if telemetry.log_probs.is_empty() {
            None
        } else {
            Some(perplexity(&telemetry.log_probs))
        };

        JobAggregates {
            avg_latency_ms: LatencySummary::from_measurements(&telemetry.latencies).mean,
            pass_rate,
            avg_perplexity,
        }
    }

    /// Builds the read-side report. Min/max latency skip zero entries, which
    /// are items that never produced output.
    pub fn report(job: &EvaluationJob, include_results: bool) -> EvaluationReport {
        let passed_items = job.passed_count();
        let latencies: Vec<f64> = job
            .results
            .iter()
            .map(|r| r.latency_ms)
            .filter(|&ms| ms > 0.0)
            .collect();
        let summary = LatencySummary::from_measurements(&latencies);

        EvaluationReport {
            job_id: job.id,
            status: job.status,
            model: job.model.clone(),
            dataset_name: job.dataset_name.clone(),
            total_items: job.total_items,
            passed_items,
            failed_items: job.results.len() - passed_items,
            pass_rate: job.pass_rate.unwrap_or(0.0),
            avg_latency_ms: job.avg_latency_ms.unwrap_or(0.0),
            min_latency_ms: summary.min,
            max_latency_ms: summary.max,
            avg_perplexity: job.avg_perplexity,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            results: (include_results && !job.results.is_empty()).then(|| job.results.clone()),
        }
    }
}
