use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Persisted email → workspace mapping entry.
///
/// `email` is the primary key (case-sensitive exact match, unique across the
/// store). `created_at` is stamped by the remote backend only; the file
/// backend leaves it absent, and serialization omits it in that case so the
/// on-disk layout stays `{"email", "workspaceName"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    #[serde(rename = "workspaceName")]
    pub workspace_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Build a record without a creation timestamp (file backend).
    pub fn new(email: &str, workspace_name: &str) -> Self {
        Self {
            email: email.to_string(),
            workspace_name: workspace_name.to_string(),
            created_at: None,
        }
    }

    /// Build a record stamped with the current time (remote backend).
    pub fn new_stamped(email: &str, workspace_name: &str) -> Self {
        Self {
            email: email.to_string(),
            workspace_name: workspace_name.to_string(),
            created_at: Some(Utc::now()),
        }
    }
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    if email.trim().is_empty() {
        return Err(ModelError::Validation("email required".into()));
    }
    if !email.contains('@') {
        return Err(ModelError::Validation("invalid email".into()));
    }
    Ok(())
}

pub fn validate_workspace_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("workspace name required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_layout_omits_created_at() {
        let rec = UserRecord::new("a@x.com", "Acme");
        let json = serde_json::to_value(&rec).expect("serialize");
        assert_eq!(json, serde_json::json!({"email": "a@x.com", "workspaceName": "Acme"}));
    }

    #[test]
    fn remote_layout_carries_iso8601_created_at() {
        let rec = UserRecord::new_stamped("a@x.com", "Acme");
        let json = serde_json::to_value(&rec).expect("serialize");
        let ts = json.get("created_at").and_then(|v| v.as_str()).expect("created_at present");
        // chrono serializes DateTime<Utc> as RFC 3339 / ISO-8601
        assert!(DateTime::parse_from_rfc3339(ts).is_ok(), "not ISO-8601: {ts}");
    }

    #[test]
    fn deserializes_without_created_at() {
        let rec: UserRecord =
            serde_json::from_str(r#"{"email":"a@x.com","workspaceName":"Acme"}"#).expect("parse");
        assert_eq!(rec.email, "a@x.com");
        assert_eq!(rec.workspace_name, "Acme");
        assert!(rec.created_at.is_none());
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn workspace_name_validation() {
        assert!(validate_workspace_name("Acme").is_ok());
        assert!(validate_workspace_name("   ").is_err());
    }
}
