use crate::db::job_run_queries;
use crate::errors::AppError;
use crate::jobs::schema_refresh_job;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

// Context passed to job functions
#[derive(Clone)]
pub struct JobContext {
    pub pool: Arc<PgPool>,
    pub http: reqwest::Client,
    pub api_version: u32,
    pub sweep_batch_size: i64,
    /// Schema runs in flight; closed and drained on shutdown
    pub runs: TaskTracker,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

pub struct JobSchedulerService {
    scheduler: JobScheduler,
    context: JobContext,
}

impl JobSchedulerService {
    pub async fn new(context: JobContext) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::External(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self { scheduler, context })
    }

    /// Registers the pending-schema sweep and starts the scheduler.
    pub async fn start(&mut self, sweep_schedule: &str, test_mode: bool) -> Result<(), AppError> {
        info!("🚀 Starting job scheduler...");

        if test_mode {
            info!("⚠️  JOB SCHEDULER IN TEST MODE - sweeping pending schemas every few seconds");
        }

        self.schedule_job(
            sweep_schedule,
            schema_refresh_job::JOB_NAME,
            "Claim pending connection requests and list their objects",
            schema_refresh_job::process_pending_schemas,
        )
        .await?;

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::External(format!("Failed to start scheduler: {}", e)))?;

        info!("✅ Job scheduler started");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), AppError> {
        info!("🛑 Stopping job scheduler...");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::External(format!("Failed to stop scheduler: {}", e)))?;
        info!("✅ Job scheduler stopped");
        Ok(())
    }

    async fn schedule_job<F, Fut>(
        &mut self,
        schedule: &str,
        job_name: &'static str,
        description: &str,
        job_fn: F,
    ) -> Result<(), AppError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<JobResult, AppError>> + Send + 'static,
    {
        let context = self.context.clone();
        let job_fn = Arc::new(job_fn);

        let job = Job::new_async(schedule, move |_uuid, _l| {
            let context = context.clone();
            let job_fn = job_fn.clone();
            Box::pin(async move {
                execute_job_with_tracking(job_name, context, job_fn).await;
            })
        })
        .map_err(|e| AppError::External(format!("Failed to create job {}: {}", job_name, e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::External(format!("Failed to add job {}: {}", job_name, e)))?;

        info!("📅 Scheduled: {} - {} [cron: {}]", job_name, description, schedule);
        Ok(())
    }
}

// Job tracking wrapper. Runs that found nothing to do are not recorded,
// so frequent sweeps do not bury real runs in job_runs.
async fn execute_job_with_tracking<F, Fut>(job_name: &str, context: JobContext, job_fn: Arc<F>)
where
    F: Fn(JobContext) -> Fut,
    Fut: std::future::Future<Output = Result<JobResult, AppError>>,
{
    let pool = context.pool.clone();
    let started_at = Utc::now();

    let result = job_fn(context).await;

    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    if !should_record(&result) {
        debug!("Job {} had nothing to do ({}ms)", job_name, duration_ms);
        return;
    }

    match result {
        Ok(job_result) => {
            info!(
                "✅ Job completed: {} (processed: {}, failed: {}, duration: {}ms)",
                job_name, job_result.items_processed, job_result.items_failed, duration_ms
            );

            if let Err(e) = job_run_queries::record_success(
                &pool,
                job_name,
                started_at,
                job_result.items_processed,
                job_result.items_failed,
                duration_ms,
            )
            .await
            {
                error!("Failed to record job success: {}", e);
            }
        }
        Err(e) => {
            error!("❌ Job failed: {} - {}", job_name, e);

            if let Err(e) = job_run_queries::record_failure(
                &pool,
                job_name,
                started_at,
                &e.to_string(),
                duration_ms,
            )
            .await
            {
                error!("Failed to record job failure: {}", e);
            }
        }
    }
}

fn should_record(result: &Result<JobResult, AppError>) -> bool {
    match result {
        Ok(job_result) => job_result.items_processed + job_result.items_failed > 0,
        Err(_) => true,
    }
}

/// Stops accepting schema runs and waits for the ones in flight. Returns
/// false when `grace` ran out first; those schemas are closed out at the
/// next startup.
pub async fn drain_runs(runs: &TaskTracker, grace: Duration) -> bool {
    runs.close();
    if runs.is_empty() {
        return true;
    }

    info!("⏳ Waiting for {} schema runs to finish", runs.len());
    match tokio::time::timeout(grace, runs.wait()).await {
        Ok(()) => true,
        Err(_) => {
            warn!("{} schema runs still in flight after {:?}", runs.len(), grace);
            false
        }
    }
}
