use crate::models::{NewObject, ObjectWithFields, SchemaField, SchemaObject};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

// Postgres caps a statement at 65535 bind parameters
const INSERT_CHUNK_ROWS: usize = 1000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InsertCounts {
    pub objects: usize,
    pub fields: usize,
}

/// Writes all collected objects and their fields for one schema inside a
/// single transaction.
pub async fn insert_all(
    pool: &PgPool,
    schema_id: Uuid,
    objects: &[NewObject],
) -> Result<InsertCounts, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let counts = insert_in_tx(&mut tx, schema_id, objects).await?;
    tx.commit().await?;
    Ok(counts)
}

async fn insert_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    schema_id: Uuid,
    objects: &[NewObject],
) -> Result<InsertCounts, sqlx::Error> {
    let object_rows: Vec<(Uuid, i32, &NewObject)> = objects
        .iter()
        .enumerate()
        .map(|(idx, o)| (Uuid::new_v4(), idx as i32, o))
        .collect();

    for chunk in object_rows.chunks(INSERT_CHUNK_ROWS) {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO objects (id, schema_id, api_name, label, position) ");
        builder.push_values(chunk, |mut b, (id, position, object)| {
            b.push_bind(*id)
                .push_bind(schema_id)
                .push_bind(&object.api_name)
                .push_bind(&object.label)
                .push_bind(*position);
        });
        builder.build().execute(&mut **tx).await?;
    }

    let field_rows: Vec<_> = object_rows
        .iter()
        .flat_map(|(object_id, _, object)| {
            object
                .fields
                .iter()
                .enumerate()
                .map(move |(idx, f)| (*object_id, idx as i32, f))
        })
        .collect();

    for chunk in field_rows.chunks(INSERT_CHUNK_ROWS) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO fields (id, object_id, api_name, label, data_type, help_text, position) ",
        );
        builder.push_values(chunk, |mut b, (object_id, position, field)| {
            b.push_bind(Uuid::new_v4())
                .push_bind(*object_id)
                .push_bind(&field.api_name)
                .push_bind(&field.label)
                .push_bind(&field.data_type)
                .push_bind(&field.help_text)
                .push_bind(*position);
        });
        builder.build().execute(&mut **tx).await?;
    }

    Ok(InsertCounts {
        objects: object_rows.len(),
        fields: field_rows.len(),
    })
}

pub async fn fetch_with_fields(
    pool: &PgPool,
    schema_id: Uuid,
) -> Result<Vec<ObjectWithFields>, sqlx::Error> {
    let objects = sqlx::query_as::<_, SchemaObject>(
        r#"
        SELECT id, schema_id, api_name, label, position
        FROM objects
        WHERE schema_id = $1
        ORDER BY position
        "#,
    )
    .bind(schema_id)
    .fetch_all(pool)
    .await?;

    let fields = sqlx::query_as::<_, SchemaField>(
        r#"
        SELECT f.id, f.object_id, f.api_name, f.label, f.data_type, f.help_text, f.position
        FROM fields f
        JOIN objects o ON o.id = f.object_id
        WHERE o.schema_id = $1
        ORDER BY o.position, f.position
        "#,
    )
    .bind(schema_id)
    .fetch_all(pool)
    .await?;

    Ok(group_fields(objects, fields))
}

fn group_fields(objects: Vec<SchemaObject>, fields: Vec<SchemaField>) -> Vec<ObjectWithFields> {
    let mut by_object: HashMap<Uuid, Vec<SchemaField>> = HashMap::new();
    for field in fields {
        by_object.entry(field.object_id).or_default().push(field);
    }

    objects
        .into_iter()
        .map(|object| {
            let fields = by_object.remove(&object.id).unwrap_or_default();
            ObjectWithFields { object, fields }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(position: i32) -> SchemaObject {
        SchemaObject {
            id: Uuid::new_v4(),
            schema_id: Uuid::nil(),
            api_name: format!("Object{}__c", position),
            label: format!("Object {}", position),
            position,
        }
    }

    fn field(object_id: Uuid, position: i32) -> SchemaField {
        SchemaField {
            id: Uuid::new_v4(),
            object_id,
            api_name: format!("Field{}", position),
            label: format!("Field {}", position),
            data_type: "Text".to_string(),
            help_text: None,
            position,
        }
    }

    #[test]
    fn test_group_fields_keeps_object_order() {
        let a = object(0);
        let b = object(1);
        let c = object(2);
        let fields = vec![field(a.id, 0), field(a.id, 1), field(c.id, 0)];

        let grouped = group_fields(vec![a.clone(), b.clone(), c.clone()], fields);

        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[0].object.id, a.id);
        assert_eq!(grouped[0].fields.len(), 2);
        assert_eq!(grouped[0].fields[1].api_name, "Field1");
        assert!(grouped[1].fields.is_empty());
        assert_eq!(grouped[2].fields.len(), 1);
    }
}
