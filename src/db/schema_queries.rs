use crate::models::{CreateSchema, Schema, SchemaStatus};
use sqlx::PgPool;
use uuid::Uuid;

const SCHEMA_COLUMNS: &str = "id, org_id, org_name, username, instance_url, access_token, \
                              status, error, created_date, finished_date";

pub async fn create(pool: &PgPool, input: &CreateSchema) -> Result<Schema, sqlx::Error> {
    sqlx::query_as::<_, Schema>(&format!(
        r#"
        INSERT INTO schemas (id, org_id, org_name, username, instance_url, access_token, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        SCHEMA_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&input.org_id)
    .bind(&input.org_name)
    .bind(&input.username)
    .bind(&input.instance_url)
    .bind(&input.access_token)
    .bind(SchemaStatus::Pending)
    .fetch_one(pool)
    .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Schema>, sqlx::Error> {
    sqlx::query_as::<_, Schema>(&format!(
        "SELECT {} FROM schemas WHERE id = $1",
        SCHEMA_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Moves one pending schema to `Running`. Returns `None` when another
/// worker already claimed it or it is not pending.
pub async fn claim(pool: &PgPool, id: Uuid) -> Result<Option<Schema>, sqlx::Error> {
    sqlx::query_as::<_, Schema>(&format!(
        r#"
        UPDATE schemas SET status = $2
        WHERE id = (
            SELECT id FROM schemas
            WHERE id = $1 AND status = $3
            FOR UPDATE SKIP LOCKED
        )
        RETURNING {}
        "#,
        SCHEMA_COLUMNS
    ))
    .bind(id)
    .bind(SchemaStatus::Running)
    .bind(SchemaStatus::Pending)
    .fetch_optional(pool)
    .await
}

/// Claims up to `limit` pending schemas, oldest first.
pub async fn claim_pending(pool: &PgPool, limit: i64) -> Result<Vec<Schema>, sqlx::Error> {
    let mut claimed = sqlx::query_as::<_, Schema>(&format!(
        r#"
        UPDATE schemas SET status = $1
        WHERE id IN (
            SELECT id FROM schemas
            WHERE status = $2
            ORDER BY created_date
            LIMIT $3
            FOR UPDATE SKIP LOCKED
        )
        RETURNING {}
        "#,
        SCHEMA_COLUMNS
    ))
    .bind(SchemaStatus::Running)
    .bind(SchemaStatus::Pending)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    // UPDATE ... RETURNING does not preserve the subquery order
    claimed.sort_by_key(|s| s.created_date);
    Ok(claimed)
}

pub async fn mark_finished(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE schemas
        SET status = $2, error = NULL, finished_date = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(SchemaStatus::Finished)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_error(pool: &PgPool, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE schemas
        SET status = $2, error = $3, finished_date = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(SchemaStatus::Error)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

/// Closes out every schema still marked `Running`, e.g. runs cut short by
/// a restart.
pub async fn fail_running(pool: &PgPool, error: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE schemas
        SET status = $2, error = $3, finished_date = NOW()
        WHERE status = $1
        "#,
    )
    .bind(SchemaStatus::Running)
    .bind(SchemaStatus::Error)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
