pub mod field_type_service;
pub mod job_scheduler_service;
pub mod schema_service;
