use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::db::job_run_queries;
use crate::errors::AppError;
use crate::models::JobRun;
use crate::state::AppState;

const RUN_HISTORY_LIMIT: i64 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recent", get(recent_job_runs))
        .route("/:job_name/history", get(job_history))
}

/// GET /api/jobs/recent - Get recent job runs
async fn recent_job_runs(State(state): State<AppState>) -> Result<Json<Vec<JobRun>>, AppError> {
    info!("GET /jobs/recent - Fetching recent job runs");
    let runs = job_run_queries::fetch_recent(&state.pool, RUN_HISTORY_LIMIT).await?;
    Ok(Json(runs))
}

/// GET /api/jobs/:job_name/history - Get history for a specific job
async fn job_history(
    Path(job_name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<JobRun>>, AppError> {
    info!("GET /jobs/{}/history - Fetching job history", job_name);
    let runs = job_run_queries::fetch_for_job(&state.pool, &job_name, RUN_HISTORY_LIMIT).await?;
    Ok(Json(runs))
}
