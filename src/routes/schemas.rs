use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{object_queries, schema_queries};
use crate::errors::AppError;
use crate::jobs::schema_refresh_job;
use crate::models::{CreateSchema, ObjectWithFields, Schema};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_schema))
        .route("/:id", get(get_schema))
        .route("/:id/objects", get(get_schema_objects))
}

/// Stores a connection request and starts listing it right away. The
/// scheduled sweep picks it up instead if this worker goes away first.
pub async fn create_schema(
    State(state): State<AppState>,
    Json(data): Json<CreateSchema>,
) -> Result<(StatusCode, Json<Schema>), AppError> {
    info!("POST /schemas - Creating schema for org {}", data.org_id);
    data.validate()?;

    let schema = schema_queries::create(&state.pool, &data).await.map_err(|e| {
        error!("Failed to create schema: {}", e);
        AppError::from(e)
    })?;

    let ctx = state.jobs.clone();
    let schema_id = schema.id;
    state.jobs.runs.spawn(async move {
        if let Err(e) = schema_refresh_job::claim_and_run(&ctx, schema_id).await {
            error!("Schema {} run failed: {}", schema_id, e);
        }
    });

    Ok((StatusCode::ACCEPTED, Json(schema)))
}

pub async fn get_schema(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Schema>, AppError> {
    info!("GET /schemas/{} - Fetching schema", id);
    let schema = schema_queries::fetch_one(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(schema))
}

pub async fn get_schema_objects(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ObjectWithFields>>, AppError> {
    info!("GET /schemas/{}/objects - Fetching objects", id);
    if schema_queries::fetch_one(&state.pool, id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let objects = object_queries::fetch_with_fields(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to fetch objects for schema {}: {}", id, e);
            AppError::from(e)
        })?;
    Ok(Json(objects))
}
