use crate::external::metadata_provider::{MetadataProvider, ObjectListing, ProviderError};
use crate::models::{NewField, NewObject};
use crate::services::field_type_service::{data_type_label, FieldTypeError};
use thiserror::Error;
use tracing::{debug, info};

/// Standard objects that are listed alongside custom (`__c`) and
/// knowledge article (`__kav`) objects.
pub const STANDARD_OBJECTS: [&str; 35] = [
    "Account",
    "AccountContactRole",
    "Activity",
    "Asset",
    "Campaign",
    "CampaignMember",
    "Case",
    "CaseContactRole",
    "Contact",
    "ContentVersion",
    "Contract",
    "ContractContactRole",
    "FAQ__DataCategorySelection",
    "FAQ__ViewStat",
    "FAQ__VoteStat",
    "Event",
    "ForecastingAdjustment",
    "ForecastingQuota",
    "KnowledgeArticle",
    "Lead",
    "Opportunity",
    "OpportunityCompetitor",
    "OpportunityContactRole",
    "OpportunityLineItem",
    "Order",
    "OrderItem",
    "PartnerRole",
    "Pricebook2",
    "PricebookEntry",
    "Product2",
    "Quote",
    "QuoteLineItem",
    "Solution",
    "Task",
    "User",
];

pub const NO_OBJECTS_MESSAGE: &str = "There was no objects returned from the query";

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to list objects")]
    Listing(#[source] ProviderError),

    #[error("failed to describe object {object}")]
    Describe {
        object: String,
        #[source]
        source: ProviderError,
    },

    #[error("failed to label fields of object {object}")]
    FieldType {
        object: String,
        #[source]
        source: FieldTypeError,
    },
}

#[derive(Debug)]
pub enum CollectedSchema {
    Objects(Vec<NewObject>),
    NoObjects { raw_body: String },
}

pub fn is_listed_object(api_name: &str) -> bool {
    STANDARD_OBJECTS.contains(&api_name)
        || api_name.ends_with("__c")
        || api_name.ends_with("__kav")
}

/// Lists the org's objects, keeps the listed ones and describes each of
/// them in listing order. The first failure aborts the whole collection.
pub async fn collect_schema(
    provider: &dyn MetadataProvider,
) -> Result<CollectedSchema, CollectError> {
    let summaries = match provider.list_objects().await.map_err(CollectError::Listing)? {
        ObjectListing::Objects(summaries) => summaries,
        ObjectListing::Missing { raw_body } => {
            return Ok(CollectedSchema::NoObjects { raw_body });
        }
    };

    let total = summaries.len();
    let mut objects = Vec::new();

    for summary in summaries.iter().filter(|s| is_listed_object(&s.name)) {
        let described = provider
            .describe_object(summary)
            .await
            .map_err(|source| CollectError::Describe {
                object: summary.name.clone(),
                source,
            })?;

        let mut fields = Vec::with_capacity(described.len());
        for field in &described {
            let data_type = data_type_label(field).map_err(|source| CollectError::FieldType {
                object: summary.name.clone(),
                source,
            })?;

            fields.push(NewField {
                api_name: field.name.clone(),
                label: field.label.clone(),
                data_type,
                help_text: field.inline_help_text.clone(),
            });
        }

        debug!("Described {} ({} fields)", summary.name, fields.len());

        objects.push(NewObject {
            api_name: summary.name.clone(),
            label: summary.label.clone(),
            fields,
        });
    }

    info!("Collected {} of {} objects", objects.len(), total);

    Ok(CollectedSchema::Objects(objects))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::external::metadata_provider::{
        FieldDescribe, MetadataProvider, ObjectListing, ProviderError, SObjectSummary,
        SObjectUrls,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// In-memory provider recording which objects were described.
    pub struct FakeProvider {
        pub listing: Mutex<Option<Result<ObjectListing, ProviderError>>>,
        pub fields: HashMap<String, Vec<FieldDescribe>>,
        pub failing: Option<String>,
        pub described: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        pub fn with_objects(objects: &[&str]) -> Self {
            let summaries = objects
                .iter()
                .map(|name| SObjectSummary {
                    name: name.to_string(),
                    label: format!("{} Label", name),
                    urls: SObjectUrls {
                        describe: format!("/services/data/v58.0/sobjects/{}/describe", name),
                    },
                })
                .collect();

            Self {
                listing: Mutex::new(Some(Ok(ObjectListing::Objects(summaries)))),
                fields: HashMap::new(),
                failing: None,
                described: Mutex::new(Vec::new()),
            }
        }

        pub fn with_listing(listing: Result<ObjectListing, ProviderError>) -> Self {
            Self {
                listing: Mutex::new(Some(listing)),
                fields: HashMap::new(),
                failing: None,
                described: Mutex::new(Vec::new()),
            }
        }

        pub fn with_fields(mut self, object: &str, fields: serde_json::Value) -> Self {
            let fields = serde_json::from_value(fields).unwrap();
            self.fields.insert(object.to_string(), fields);
            self
        }

        pub fn failing_on(mut self, object: &str) -> Self {
            self.failing = Some(object.to_string());
            self
        }
    }

    #[async_trait]
    impl MetadataProvider for FakeProvider {
        async fn list_objects(&self) -> Result<ObjectListing, ProviderError> {
            self.listing
                .lock()
                .take()
                .unwrap_or_else(|| Err(ProviderError::BadResponse("listed twice".into())))
        }

        async fn describe_object(
            &self,
            object: &SObjectSummary,
        ) -> Result<Vec<FieldDescribe>, ProviderError> {
            self.described.lock().push(object.name.clone());

            if self.failing.as_deref() == Some(object.name.as_str()) {
                return Err(ProviderError::Network("connection reset".into()));
            }

            Ok(self.fields.get(&object.name).cloned().unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeProvider;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listed_objects() {
        assert!(is_listed_object("Account"));
        assert!(is_listed_object("FAQ__ViewStat"));
        assert!(is_listed_object("Invoice__c"));
        assert!(is_listed_object("Manual__kav"));

        assert!(!is_listed_object("AccountHistory"));
        assert!(!is_listed_object("account"));
        assert!(!is_listed_object("Invoice__Share"));
        assert!(!is_listed_object("Manual__ka"));
    }

    #[test]
    fn test_standard_objects_are_unique() {
        let mut names = STANDARD_OBJECTS.to_vec();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), STANDARD_OBJECTS.len());
    }

    #[tokio::test]
    async fn test_collect_filters_and_keeps_order() {
        let provider = FakeProvider::with_objects(&[
            "Invoice__c",
            "AccountHistory",
            "Account",
            "Apex__Share",
            "Manual__kav",
        ])
        .with_fields(
            "Account",
            json!([
                {"name": "Name", "label": "Account Name", "type": "string", "length": 255},
                {"name": "OwnerId", "label": "Owner", "type": "reference",
                 "referenceTo": ["User"], "inlineHelpText": "Record owner"}
            ]),
        );

        let collected = collect_schema(&provider).await.unwrap();
        let objects = match collected {
            CollectedSchema::Objects(objects) => objects,
            other => panic!("expected objects, got {:?}", other),
        };

        let names: Vec<&str> = objects.iter().map(|o| o.api_name.as_str()).collect();
        assert_eq!(names, vec!["Invoice__c", "Account", "Manual__kav"]);
        assert_eq!(*provider.described.lock(), vec!["Invoice__c", "Account", "Manual__kav"]);

        let account = &objects[1];
        assert_eq!(account.label, "Account Label");
        assert_eq!(
            account.fields,
            vec![
                NewField {
                    api_name: "Name".to_string(),
                    label: "Account Name".to_string(),
                    data_type: "String (255)".to_string(),
                    help_text: None,
                },
                NewField {
                    api_name: "OwnerId".to_string(),
                    label: "Owner".to_string(),
                    data_type: "Lookup (User)".to_string(),
                    help_text: Some("Record owner".to_string()),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_missing_listing() {
        let provider = FakeProvider::with_listing(Ok(ObjectListing::Missing {
            raw_body: "[{\"errorCode\":\"INVALID_SESSION_ID\"}]".to_string(),
        }));

        match collect_schema(&provider).await.unwrap() {
            CollectedSchema::NoObjects { raw_body } => {
                assert!(raw_body.contains("INVALID_SESSION_ID"))
            }
            other => panic!("expected no objects, got {:?}", other),
        }
        assert!(provider.described.lock().is_empty());
    }

    #[tokio::test]
    async fn test_collect_aborts_on_first_describe_failure() {
        let provider =
            FakeProvider::with_objects(&["Account", "Contact", "Lead"]).failing_on("Contact");

        let err = collect_schema(&provider).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to describe object Contact");
        assert!(matches!(
            err,
            CollectError::Describe { source: ProviderError::Network(_), .. }
        ));
        assert_eq!(*provider.described.lock(), vec!["Account", "Contact"]);
    }

    #[tokio::test]
    async fn test_collect_listing_failure() {
        let provider =
            FakeProvider::with_listing(Err(ProviderError::Network("timed out".into())));

        let err = collect_schema(&provider).await.unwrap_err();
        assert!(matches!(err, CollectError::Listing(_)));
    }

    #[tokio::test]
    async fn test_collect_bad_numeric_attribute() {
        let provider = FakeProvider::with_objects(&["Quote"]).with_fields(
            "Quote",
            json!([{"name": "Discount", "label": "Discount", "type": "percent",
                    "precision": "n/a", "scale": 2}]),
        );

        let err = collect_schema(&provider).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to label fields of object Quote");
    }
}
