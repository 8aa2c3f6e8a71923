mod job_run;
mod schema;
mod sobject;

pub use job_run::JobRun;
pub use schema::{CreateSchema, Schema, SchemaStatus};
pub use sobject::{NewField, NewObject, ObjectWithFields, SchemaField, SchemaObject};
