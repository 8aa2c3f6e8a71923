use sqlx::PgPool;
use uuid::Uuid;

pub async fn insert(pool: &PgPool, schema_id: Option<Uuid>, body: &str) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO debug (id, schema_id, debug) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(schema_id)
        .bind(body)
        .execute(pool)
        .await?;
    Ok(id)
}
