use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Processing state of a connection request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum SchemaStatus {
    /// Submitted by the web tier, waiting for a worker
    Pending,
    /// Claimed by a worker
    Running,
    Finished,
    Error,
}

impl std::fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaStatus::Pending => write!(f, "Pending"),
            SchemaStatus::Running => write!(f, "Running"),
            SchemaStatus::Finished => write!(f, "Finished"),
            SchemaStatus::Error => write!(f, "Error"),
        }
    }
}

// A stored set of org credentials plus the outcome of the last listing run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Schema {
    pub id: Uuid,
    pub org_id: String,
    pub org_name: Option<String>,
    pub username: Option<String>,
    pub instance_url: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub status: SchemaStatus,
    pub error: Option<String>,
    pub created_date: DateTime<Utc>,
    pub finished_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSchema {
    pub org_id: String,
    pub instance_url: String,
    pub access_token: String,
    pub org_name: Option<String>,
    pub username: Option<String>,
}

impl CreateSchema {
    pub fn validate(&self) -> Result<(), String> {
        if self.org_id.trim().is_empty() {
            return Err("org_id must not be empty".to_string());
        }
        if self.access_token.trim().is_empty() {
            return Err("access_token must not be empty".to_string());
        }

        let url = url::Url::parse(&self.instance_url)
            .map_err(|e| format!("instance_url is not a valid URL: {}", e))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(format!("instance_url must use http(s), got {}", url.scheme()));
        }
        if url.host_str().is_none() {
            return Err("instance_url must include a host".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(instance_url: &str) -> CreateSchema {
        CreateSchema {
            org_id: "00D000000000001".to_string(),
            instance_url: instance_url.to_string(),
            access_token: "token".to_string(),
            org_name: None,
            username: None,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request("https://na1.salesforce.com").validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_instance_url() {
        assert!(request("na1.salesforce.com").validate().is_err());
        assert!(request("ftp://na1.salesforce.com").validate().is_err());
    }

    #[test]
    fn test_rejects_blank_token() {
        let mut req = request("https://na1.salesforce.com");
        req.access_token = "  ".to_string();
        assert_eq!(
            req.validate().unwrap_err(),
            "access_token must not be empty"
        );
    }

    #[test]
    fn test_token_not_serialized() {
        let schema = Schema {
            id: Uuid::new_v4(),
            org_id: "00D".to_string(),
            org_name: None,
            username: None,
            instance_url: "https://na1.salesforce.com".to_string(),
            access_token: "secret-token".to_string(),
            status: SchemaStatus::Pending,
            error: None,
            created_date: Utc::now(),
            finished_date: None,
        };

        let json = serde_json::to_string(&schema).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(json.contains("\"status\":\"Pending\""));
    }
}
