use async_trait::async_trait;
use chrono::{DateTime, Utc};
use llm_eval_core::{
    CoreError, EvaluationItem, EvaluationJob, GenerationParams, ItemResult, JobId, JobStatus,
    JobStore, JobSummary, MetricConfig, Result,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const JOB_COLUMNS: &str = "id, status, model, dataset_name, metric_config, generation, inputs, \
     results, total_items, completed_items, avg_latency_ms, avg_perplexity, pass_rate, \
     created_at, started_at, completed_at, error_message";

const SUMMARY_COLUMNS: &str = "id, status, model, dataset_name, total_items, completed_items, \
     pass_rate, avg_latency_ms, created_at";

/// Job store on PostgreSQL. Inputs, results and configuration live in JSONB
/// columns so that one `UPDATE` checkpoints a whole record.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: &EvaluationJob) -> Result<JobId> {
        let result = sqlx::query(
            r#"
            INSERT INTO evaluation_jobs (
                id, status, model, dataset_name, metric_config, generation, inputs,
                results, total_items, completed_items, avg_latency_ms, avg_perplexity,
                pass_rate, created_at, started_at, completed_at, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.status.as_str())
        .bind(&job.model)
        .bind(&job.dataset_name)
        .bind(Json(&job.metric_config))
        .bind(Json(&job.generation))
        .bind(Json(&job.inputs))
        .bind(Json(&job.results))
        .bind(job.total_items as i64)
        .bind(job.completed_items as i64)
        .bind(job.avg_latency_ms)
        .bind(job.avg_perplexity)
        .bind(job.pass_rate)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(&job.error_message)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(job.id),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(CoreError::AlreadyExists(format!("job {}", job.id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &JobId) -> Result<Option<EvaluationJob>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM evaluation_jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row_to_job(&row)).transpose()
    }

    async fn update(&self, job: &EvaluationJob) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE evaluation_jobs
            SET status = $2,
                results = $3,
                completed_items = $4,
                avg_latency_ms = $5,
                avg_perplexity = $6,
                pass_rate = $7,
                started_at = $8,
                completed_at = $9,
                error_message = $10
            WHERE id = $1
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.status.as_str())
        .bind(Json(&job.results))
        .bind(job.completed_items as i64)
        .bind(job.avg_latency_ms)
        .bind(job.avg_perplexity)
        .bind(job.pass_rate)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(&job.error_message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("job {}", job.id)));
        }
        Ok(())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<JobSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM evaluation_jobs ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            SUMMARY_COLUMNS
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_summary).collect()
    }
}

fn count(row: &PgRow, column: &str) -> Result<usize> {
    let value: i64 = row.try_get(column)?;
    usize::try_from(value)
        .map_err(|_| CoreError::Database(format!("negative {} in evaluation_jobs", column)))
}

fn row_to_job(row: &PgRow) -> Result<EvaluationJob> {
    let status: String = row.try_get("status")?;
    let metric_config: Json<MetricConfig> = row.try_get("metric_config")?;
    let generation: Json<GenerationParams> = row.try_get("generation")?;
    let inputs: Json<Vec<EvaluationItem>> = row.try_get("inputs")?;
    let results: Json<Vec<ItemResult>> = row.try_get("results")?;

    Ok(EvaluationJob {
        id: JobId::from_uuid(row.try_get::<Uuid, _>("id")?),
        status: status.parse::<JobStatus>()?,
        model: row.try_get("model")?,
        dataset_name: row.try_get("dataset_name")?,
        metric_config: metric_config.0,
        generation: generation.0,
        inputs: inputs.0,
        results: results.0,
        total_items: count(row, "total_items")?,
        completed_items: count(row, "completed_items")?,
        avg_latency_ms: row.try_get("avg_latency_ms")?,
        avg_perplexity: row.try_get("avg_perplexity")?,
        pass_rate: row.try_get("pass_rate")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        error_message: row.try_get("error_message")?,
    })
}

fn row_to_summary(row: &PgRow) -> Result<JobSummary> {
    let status: String = row.try_get("status")?;

    Ok(JobSummary {
        id: JobId::from_uuid(row.try_get::<Uuid, _>("id")?),
        status: status.parse::<JobStatus>()?,
        model: row.try_get("model")?,
        dataset_name: row.try_get("dataset_name")?,
        total_items: count(row, "total_items")?,
        completed_items: count(row, "completed_items")?,
        pass_rate: row.try_get("pass_rate")?,
        avg_latency_ms: row.try_get("avg_latency_ms")?,
        created_at: row.try_get("created_at")?,
    })
}
