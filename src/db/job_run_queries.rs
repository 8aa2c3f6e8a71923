use crate::models::JobRun;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub async fn record_success(
    pool: &PgPool,
    job_name: &str,
    started_at: DateTime<Utc>,
    items_processed: i32,
    items_failed: i32,
    duration_ms: i64,
) -> Result<i32, sqlx::Error> {
    let (id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO job_runs
            (job_name, started_at, completed_at, status, items_processed, items_failed, duration_ms)
        VALUES ($1, $2, NOW(), 'success'::job_status, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(job_name)
    .bind(started_at)
    .bind(items_processed)
    .bind(items_failed)
    .bind(duration_ms)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

pub async fn record_failure(
    pool: &PgPool,
    job_name: &str,
    started_at: DateTime<Utc>,
    error_message: &str,
    duration_ms: i64,
) -> Result<i32, sqlx::Error> {
    let (id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO job_runs
            (job_name, started_at, completed_at, status, error_message, duration_ms)
        VALUES ($1, $2, NOW(), 'failed'::job_status, $3, $4)
        RETURNING id
        "#,
    )
    .bind(job_name)
    .bind(started_at)
    .bind(error_message)
    .bind(duration_ms)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

const JOB_RUN_COLUMNS: &str = r#"
    id,
    job_name,
    started_at::TEXT AS started_at,
    completed_at::TEXT AS completed_at,
    status::TEXT AS status,
    error_message,
    items_processed,
    items_failed,
    duration_ms
"#;

pub async fn fetch_recent(pool: &PgPool, limit: i64) -> Result<Vec<JobRun>, sqlx::Error> {
    sqlx::query_as::<_, JobRun>(&format!(
        "SELECT {} FROM job_runs ORDER BY started_at DESC LIMIT $1",
        JOB_RUN_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn fetch_for_job(
    pool: &PgPool,
    job_name: &str,
    limit: i64,
) -> Result<Vec<JobRun>, sqlx::Error> {
    sqlx::query_as::<_, JobRun>(&format!(
        "SELECT {} FROM job_runs WHERE job_name = $1 ORDER BY started_at DESC LIMIT $2",
        JOB_RUN_COLUMNS
    ))
    .bind(job_name)
    .bind(limit)
    .fetch_all(pool)
    .await
}
