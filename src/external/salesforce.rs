use crate::external::metadata_provider::{
    FieldDescribe, MetadataProvider, ObjectListing, ProviderError, SObjectSummary,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// REST client bound to a single org's instance and session token.
pub struct SalesforceClient {
    client: reqwest::Client,
    instance_url: String,
    access_token: String,
    api_version: u32,
}

impl SalesforceClient {
    pub fn new(
        client: reqwest::Client,
        instance_url: &str,
        access_token: &str,
        api_version: u32,
    ) -> Self {
        Self {
            client,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            api_version,
        }
    }

    pub fn sobjects_url(&self) -> String {
        format!(
            "{}/services/data/v{}.0/sobjects/",
            self.instance_url, self.api_version
        )
    }

    pub fn describe_url(&self, object: &SObjectSummary) -> String {
        format!("{}{}", self.instance_url, object.urls.describe)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ProviderError> {
        self.client
            .get(url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct SObjectListResponse {
    sobjects: Vec<SObjectSummary>,
}

#[derive(Debug, Deserialize)]
struct DescribeResponse {
    fields: Vec<FieldDescribe>,
}

/// Interprets the body of the object listing call.
///
/// Anything that is valid JSON but lacks `sobjects` is reported as
/// `ObjectListing::Missing` rather than an error, so the caller can keep
/// the payload around.
pub fn parse_object_listing(body: &str) -> Result<ObjectListing, ProviderError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let has_sobjects = value
        .as_object()
        .map(|o| o.contains_key("sobjects"))
        .unwrap_or(false);

    if !has_sobjects {
        return Ok(ObjectListing::Missing {
            raw_body: body.to_string(),
        });
    }

    let listing: SObjectListResponse =
        serde_json::from_value(value).map_err(|e| ProviderError::Parse(e.to_string()))?;

    Ok(ObjectListing::Objects(listing.sobjects))
}

pub fn parse_describe(body: &str) -> Result<Vec<FieldDescribe>, ProviderError> {
    let describe: DescribeResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(describe.fields)
}

#[async_trait]
impl MetadataProvider for SalesforceClient {
    async fn list_objects(&self) -> Result<ObjectListing, ProviderError> {
        let url = self.sobjects_url();
        debug!("Listing objects from {}", url);

        let resp = self.get(&url).await?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!("Object listing returned HTTP {}", status);
        }

        parse_object_listing(&body)
    }

    async fn describe_object(
        &self,
        object: &SObjectSummary,
    ) -> Result<Vec<FieldDescribe>, ProviderError> {
        let url = self.describe_url(object);
        debug!("Describing {} from {}", object.name, url);

        let resp = self.get(&url).await?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unauthorized(format!(
                "describe of {} rejected: {}",
                object.name, body
            )));
        }

        if !status.is_success() {
            return Err(ProviderError::BadResponse(format!(
                "describe of {} returned HTTP {}: {}",
                object.name, status, body
            )));
        }

        parse_describe(&body)
    }
}
