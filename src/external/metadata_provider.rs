use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// One entry of the org-wide object listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SObjectSummary {
    pub name: String,
    pub label: String,
    pub urls: SObjectUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SObjectUrls {
    /// Instance-relative path of the describe resource
    pub describe: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PicklistEntry {
    pub label: Option<String>,
    pub value: Option<String>,
}

/// Field metadata as returned by an object describe call.
///
/// Numeric attributes and `calculated` are kept as raw JSON values: some
/// orgs and API versions send them as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescribe {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub calculated: Option<Value>,
    #[serde(default)]
    pub reference_to: Option<Vec<String>>,
    #[serde(default)]
    pub picklist_values: Option<Vec<PicklistEntry>>,
    #[serde(default)]
    pub length: Option<Value>,
    #[serde(default)]
    pub precision: Option<Value>,
    #[serde(default)]
    pub scale: Option<Value>,
    #[serde(default)]
    pub inline_help_text: Option<String>,
}

/// Result of listing the org's objects.
#[derive(Debug, Clone)]
pub enum ObjectListing {
    Objects(Vec<SObjectSummary>),
    /// The body carried no `sobjects` key (expired session, wrong
    /// instance, ...). The body is kept verbatim for troubleshooting.
    Missing { raw_body: String },
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn list_objects(&self) -> Result<ObjectListing, ProviderError>;

    async fn describe_object(
        &self,
        object: &SObjectSummary,
    ) -> Result<Vec<FieldDescribe>, ProviderError>;
}
