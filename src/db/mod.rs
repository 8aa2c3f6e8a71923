pub mod debug_queries;
pub mod job_run_queries;
pub mod object_queries;
pub mod schema_queries;
pub mod schema_store;
