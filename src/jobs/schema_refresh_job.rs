//! Schema Refresh Background Job
//!
//! Turns a connection request (a `schemas` row holding an instance URL and
//! session token) into the list of objects and fields shown by the web
//! tier.
//!
//! # Flow
//!
//! 1. Claim the schema (`Pending` -> `Running`)
//! 2. List the org's objects and keep standard, custom and knowledge
//!    article objects
//! 3. Describe each kept object and label its fields
//! 4. Store objects and fields in one transaction
//! 5. Mark the schema `Finished`, or `Error` with the failure report
//!
//! # Error Handling
//!
//! There are no retries and no partial results: the first failure aborts
//! the run. A listing without objects stores the raw response in `debug`
//! for troubleshooting.
//!
//! Runs execute on the context's task tracker, which shutdown drains. A
//! run that panics is marked `Error`; rows left `Running` by a killed
//! worker are closed out at the next startup.

use crate::db::schema_queries;
use crate::db::schema_store::{PgSchemaStore, SchemaStore};
use crate::errors::AppError;
use crate::external::metadata_provider::MetadataProvider;
use crate::external::salesforce::SalesforceClient;
use crate::models::{Schema, SchemaStatus};
use crate::services::job_scheduler_service::{JobContext, JobResult};
use crate::services::schema_service::{collect_schema, CollectedSchema, NO_OBJECTS_MESSAGE};
use anyhow::Context;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const JOB_NAME: &str = "process_pending_schemas";

pub const ABANDONED_RUN_MESSAGE: &str =
    "The worker restarted before this schema finished; please submit it again";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaRunOutcome {
    pub schema_id: Uuid,
    pub status: SchemaStatus,
    pub objects: usize,
    pub fields: usize,
}

enum Stored {
    Objects(crate::db::object_queries::InsertCounts),
    NoObjects,
}

/// Scheduled entry point: claims a batch of pending schemas and runs them
/// one after another.
pub async fn process_pending_schemas(ctx: JobContext) -> Result<JobResult, AppError> {
    if ctx.runs.is_closed() {
        return Ok(JobResult::default());
    }

    let claimed = schema_queries::claim_pending(&ctx.pool, ctx.sweep_batch_size).await?;

    if claimed.is_empty() {
        return Ok(JobResult::default());
    }

    info!("Claimed {} pending schemas", claimed.len());

    let mut processed = 0;
    let mut failed = 0;

    for schema in claimed {
        let schema_id = schema.id;
        match run_tracked(&ctx, schema).await {
            Ok(outcome) if outcome.status == SchemaStatus::Finished => processed += 1,
            Ok(_) => failed += 1,
            Err(e) => {
                error!("Failed to record outcome of schema {}: {}", schema_id, e);
                failed += 1;
            }
        }
    }

    Ok(JobResult {
        items_processed: processed,
        items_failed: failed,
    })
}

/// Claims a single schema and runs it. Returns `None` when the schema was
/// not pending any more (e.g. the sweep got to it first) or the worker is
/// shutting down.
pub async fn claim_and_run(
    ctx: &JobContext,
    schema_id: Uuid,
) -> Result<Option<SchemaRunOutcome>, AppError> {
    if ctx.runs.is_closed() {
        info!("Shutting down, leaving schema {} for the next worker", schema_id);
        return Ok(None);
    }

    match schema_queries::claim(&ctx.pool, schema_id).await? {
        Some(schema) => Ok(Some(run_tracked(ctx, schema).await?)),
        None => {
            info!("Schema {} already claimed, skipping", schema_id);
            Ok(None)
        }
    }
}

/// Runs a claimed schema on the task tracker so shutdown waits for it. A
/// panicking run is recorded as an error instead of staying `Running`.
async fn run_tracked(ctx: &JobContext, schema: Schema) -> Result<SchemaRunOutcome, AppError> {
    let schema_id = schema.id;
    let run_ctx = ctx.clone();
    let handle = ctx
        .runs
        .spawn(async move { run_schema_refresh(&run_ctx, &schema).await });

    match handle.await {
        Ok(result) => result,
        Err(join_error) => {
            let store = PgSchemaStore::new(&ctx.pool);
            record_aborted_run(&store, schema_id, &join_error.to_string()).await
        }
    }
}

pub async fn run_schema_refresh(
    ctx: &JobContext,
    schema: &Schema,
) -> Result<SchemaRunOutcome, AppError> {
    let client = SalesforceClient::new(
        ctx.http.clone(),
        &schema.instance_url,
        &schema.access_token,
        ctx.api_version,
    );

    run_with_provider(&PgSchemaStore::new(&ctx.pool), schema.id, &client).await
}

/// Runs one refresh against `provider` and records the outcome on the
/// schema row. Only a failure to record the outcome is returned as an
/// error.
pub async fn run_with_provider(
    store: &dyn SchemaStore,
    schema_id: Uuid,
    provider: &dyn MetadataProvider,
) -> Result<SchemaRunOutcome, AppError> {
    info!("🔎 Listing objects for schema {}", schema_id);

    let outcome = match refresh(store, schema_id, provider).await {
        Ok(Stored::Objects(counts)) => {
            store.mark_finished(schema_id).await?;
            info!(
                "✅ Schema {} finished: {} objects, {} fields",
                schema_id, counts.objects, counts.fields
            );
            SchemaRunOutcome {
                schema_id,
                status: SchemaStatus::Finished,
                objects: counts.objects,
                fields: counts.fields,
            }
        }
        Ok(Stored::NoObjects) => {
            store.mark_error(schema_id, NO_OBJECTS_MESSAGE).await?;
            warn!("Schema {}: {}", schema_id, NO_OBJECTS_MESSAGE);
            failed_outcome(schema_id)
        }
        Err(e) => {
            let report = error_report(&e);
            error!("❌ Schema {} failed: {:#}", schema_id, e);
            store.mark_error(schema_id, &report).await?;
            failed_outcome(schema_id)
        }
    };

    Ok(outcome)
}

async fn refresh(
    store: &dyn SchemaStore,
    schema_id: Uuid,
    provider: &dyn MetadataProvider,
) -> anyhow::Result<Stored> {
    match collect_schema(provider).await? {
        CollectedSchema::Objects(objects) => {
            let counts = store
                .insert_objects(schema_id, &objects)
                .await
                .context("failed to store objects and fields")?;
            Ok(Stored::Objects(counts))
        }
        CollectedSchema::NoObjects { raw_body } => {
            store
                .insert_debug(schema_id, &raw_body)
                .await
                .context("failed to store the listing response")?;
            Ok(Stored::NoObjects)
        }
    }
}

async fn record_aborted_run(
    store: &dyn SchemaStore,
    schema_id: Uuid,
    reason: &str,
) -> Result<SchemaRunOutcome, AppError> {
    error!("❌ Schema {} run aborted: {}", schema_id, reason);
    store
        .mark_error(schema_id, &format!("The schema run was aborted: {}", reason))
        .await?;
    Ok(failed_outcome(schema_id))
}

/// Marks schemas left `Running` by a previous worker process as failed.
/// Called once at startup, before any new run is claimed.
pub async fn recover_abandoned_runs(store: &dyn SchemaStore) -> Result<u64, AppError> {
    let recovered = store.fail_running(ABANDONED_RUN_MESSAGE).await?;
    if recovered > 0 {
        warn!("Closed out {} schemas abandoned by a previous worker", recovered);
    }
    Ok(recovered)
}

fn failed_outcome(schema_id: Uuid) -> SchemaRunOutcome {
    SchemaRunOutcome {
        schema_id,
        status: SchemaStatus::Error,
        objects: 0,
        fields: 0,
    }
}

/// Renders an error with its full cause chain, the text the web tier shows
/// for a failed schema.
pub fn error_report(error: &anyhow::Error) -> String {
    format!("{:?}", error)
}
