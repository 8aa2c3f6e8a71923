use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Serialize, FromRow)]
pub struct JobRun {
    pub id: i32,
    pub job_name: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub items_processed: Option<i32>,
    pub items_failed: Option<i32>,
    pub duration_ms: Option<i64>,
}
