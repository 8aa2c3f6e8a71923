use crate::services::job_scheduler_service::JobContext;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jobs: JobContext,
}
