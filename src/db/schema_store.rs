use crate::db::object_queries::{self, InsertCounts};
use crate::db::{debug_queries, schema_queries};
use crate::models::NewObject;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Writes made while running a schema refresh.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Stores all objects and fields of one run, or nothing at all.
    async fn insert_objects(
        &self,
        schema_id: Uuid,
        objects: &[NewObject],
    ) -> Result<InsertCounts, sqlx::Error>;

    async fn insert_debug(&self, schema_id: Uuid, body: &str) -> Result<(), sqlx::Error>;

    async fn mark_finished(&self, schema_id: Uuid) -> Result<(), sqlx::Error>;

    async fn mark_error(&self, schema_id: Uuid, error: &str) -> Result<(), sqlx::Error>;

    /// Moves every `Running` schema to `Error`. Returns how many were moved.
    async fn fail_running(&self, error: &str) -> Result<u64, sqlx::Error>;
}

pub struct PgSchemaStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgSchemaStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaStore for PgSchemaStore<'_> {
    async fn insert_objects(
        &self,
        schema_id: Uuid,
        objects: &[NewObject],
    ) -> Result<InsertCounts, sqlx::Error> {
        object_queries::insert_all(self.pool, schema_id, objects).await
    }

    async fn insert_debug(&self, schema_id: Uuid, body: &str) -> Result<(), sqlx::Error> {
        debug_queries::insert(self.pool, Some(schema_id), body).await?;
        Ok(())
    }

    async fn mark_finished(&self, schema_id: Uuid) -> Result<(), sqlx::Error> {
        schema_queries::mark_finished(self.pool, schema_id).await
    }

    async fn mark_error(&self, schema_id: Uuid, error: &str) -> Result<(), sqlx::Error> {
        schema_queries::mark_error(self.pool, schema_id, error).await
    }

    async fn fail_running(&self, error: &str) -> Result<u64, sqlx::Error> {
        schema_queries::fail_running(self.pool, error).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::SchemaStatus;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedSchema {
        pub status: SchemaStatus,
        pub error: Option<String>,
        pub finished: bool,
    }

    /// In-memory store. Object inserts apply all-or-nothing like the
    /// Postgres transaction does.
    #[derive(Default)]
    pub struct RecordingStore {
        pub schemas: Mutex<Vec<(Uuid, RecordedSchema)>>,
        pub objects: Mutex<Vec<(Uuid, NewObject)>>,
        pub debug: Mutex<Vec<(Uuid, String)>>,
        pub fail_inserts: bool,
        pub fail_status_writes: bool,
    }

    impl RecordingStore {
        pub fn with_running(ids: &[Uuid]) -> Self {
            let store = Self::default();
            for id in ids {
                store.schemas.lock().push((
                    *id,
                    RecordedSchema {
                        status: SchemaStatus::Running,
                        error: None,
                        finished: false,
                    },
                ));
            }
            store
        }

        pub fn schema(&self, id: Uuid) -> Option<RecordedSchema> {
            self.schemas
                .lock()
                .iter()
                .find(|(sid, _)| *sid == id)
                .map(|(_, s)| s.clone())
        }

        fn set(&self, id: Uuid, status: SchemaStatus, error: Option<String>) {
            let mut schemas = self.schemas.lock();
            let record = RecordedSchema {
                status,
                error,
                finished: true,
            };
            match schemas.iter_mut().find(|(sid, _)| *sid == id) {
                Some((_, existing)) => *existing = record,
                None => schemas.push((id, record)),
            }
        }
    }

    #[async_trait]
    impl SchemaStore for RecordingStore {
        async fn insert_objects(
            &self,
            schema_id: Uuid,
            objects: &[NewObject],
        ) -> Result<InsertCounts, sqlx::Error> {
            if self.fail_inserts {
                return Err(sqlx::Error::PoolTimedOut);
            }

            let mut stored = self.objects.lock();
            for object in objects {
                stored.push((schema_id, object.clone()));
            }

            Ok(InsertCounts {
                objects: objects.len(),
                fields: objects.iter().map(|o| o.fields.len()).sum(),
            })
        }

        async fn insert_debug(&self, schema_id: Uuid, body: &str) -> Result<(), sqlx::Error> {
            self.debug.lock().push((schema_id, body.to_string()));
            Ok(())
        }

        async fn mark_finished(&self, schema_id: Uuid) -> Result<(), sqlx::Error> {
            if self.fail_status_writes {
                return Err(sqlx::Error::PoolTimedOut);
            }
            self.set(schema_id, SchemaStatus::Finished, None);
            Ok(())
        }

        async fn mark_error(&self, schema_id: Uuid, error: &str) -> Result<(), sqlx::Error> {
            if self.fail_status_writes {
                return Err(sqlx::Error::PoolTimedOut);
            }
            self.set(schema_id, SchemaStatus::Error, Some(error.to_string()));
            Ok(())
        }

        async fn fail_running(&self, error: &str) -> Result<u64, sqlx::Error> {
            let mut moved = 0;
            for (_, schema) in self.schemas.lock().iter_mut() {
                if schema.status == SchemaStatus::Running {
                    schema.status = SchemaStatus::Error;
                    schema.error = Some(error.to_string());
                    schema.finished = true;
                    moved += 1;
                }
            }
            Ok(moved)
        }
    }
}
