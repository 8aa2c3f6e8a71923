mod app;
mod config;
mod db;
mod errors;
mod external;
mod jobs;
mod logging;
mod models;
mod routes;
mod services;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use tokio_util::task::TaskTracker;

use crate::config::WorkerConfig;
use crate::db::schema_store::PgSchemaStore;
use crate::jobs::schema_refresh_job;
use crate::logging::LoggingConfig;
use crate::services::job_scheduler_service::{self, JobContext, JobSchedulerService};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    logging::init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let config = WorkerConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    schema_refresh_job::recover_abandoned_runs(&PgSchemaStore::new(&pool)).await?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    tracing::info!(
        "📊 Using Salesforce API v{}.0 (timeout {}s)",
        config.salesforce_api_version,
        config.http_timeout_secs
    );

    let jobs = JobContext {
        pool: Arc::new(pool.clone()),
        http,
        api_version: config.salesforce_api_version,
        sweep_batch_size: config.sweep_batch_size,
        runs: TaskTracker::new(),
    };
    let runs = jobs.runs.clone();

    let mut scheduler = JobSchedulerService::new(jobs.clone()).await?;
    scheduler
        .start(&config.sweep_schedule, config.scheduler_test_mode)
        .await?;

    let state = AppState { pool, jobs };
    let app = app::create_app(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("🚀 Schema worker running at http://{}/", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await?;
    job_scheduler_service::drain_runs(&runs, Duration::from_secs(config.shutdown_grace_secs)).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
