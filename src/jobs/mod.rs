//! Background Jobs Module
//!
//! - `schema_refresh_job` - lists an org's objects and fields for a
//!   pending connection request and records the outcome
//!
//! Jobs are registered with the job scheduler service; their runs are
//! tracked in `job_runs`.

pub mod schema_refresh_job;
