use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ==============================================================================
// Persisted rows
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SchemaObject {
    pub id: Uuid,
    pub schema_id: Uuid,
    pub api_name: String,
    pub label: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SchemaField {
    pub id: Uuid,
    pub object_id: Uuid,
    pub api_name: String,
    pub label: String,
    pub data_type: String,
    pub help_text: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectWithFields {
    #[serde(flatten)]
    pub object: SchemaObject,
    pub fields: Vec<SchemaField>,
}

// ==============================================================================
// Collected (not yet persisted) rows
// ==============================================================================

/// A field after its type description has been turned into a display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewField {
    pub api_name: String,
    pub label: String,
    pub data_type: String,
    pub help_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObject {
    pub api_name: String,
    pub label: String,
    pub fields: Vec<NewField>,
}
