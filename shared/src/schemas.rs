use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utilities::errors::AppError;

/// Shape of the creation payloads accepted by the destination control plane.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaVersion {
    /// Cluster-scoped `/v1/k8s/clusters/{id}/...` endpoints with `maxAllowed` quotas.
    Legacy,
    /// Departments created through `/api/v1/org-unit/departments` with `limit` quotas.
    #[default]
    OrgUnit,
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::OrgUnit => f.write_str("org-unit"),
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "v1" => Ok(Self::Legacy),
            "org-unit" | "orgunit" | "v2" => Ok(Self::OrgUnit),
            other => Err(AppError::InvalidConfig {
                key: "TARGET_SCHEMA".to_string(),
                reason: format!("expected 'legacy' or 'org-unit', found '{other}'"),
            }),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AppTokenRequest<'a> {
    pub grant_type: &'static str,
    #[serde(rename = "AppId")]
    pub app_id: &'a str,
    #[serde(rename = "AppSecret")]
    pub app_secret: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct AppTokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RealmTokenResponse {
    pub access_token: Option<String>,
}

/// Envelope keys the listing endpoints wrap their collections in.
const COLLECTION_KEYS: [&str; 5] = ["accessRules", "entries", "nodeTypes", "departments", "projects"];

/// Accepts either a bare array or one of the listing envelopes and returns the items in order.
pub fn unwrap_collection(value: Value) -> Result<Vec<Value>, AppError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in COLLECTION_KEYS {
                if let Some(Value::Array(items)) = map.remove(key) {
                    return Ok(items);
                }
            }
            Err(AppError::UnexpectedShape(format!(
                "object without a known collection key, keys: {:?}",
                map.keys().collect::<Vec<_>>()
            )))
        }
        Value::Null => Ok(Vec::new()),
        other => Err(AppError::UnexpectedShape(format!(
            "expected a collection, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_access_rule_envelope() {
        let items = unwrap_collection(json!({
            "totalRecords": 2,
            "accessRules": [{"id": 1}, {"id": 2}]
        }))
        .unwrap();
        assert_eq!(items, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[test]
    fn bare_arrays_pass_through() {
        let items = unwrap_collection(json!([{"name": "a"}])).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn rejects_unknown_objects() {
        assert!(unwrap_collection(json!({"foo": []})).is_err());
    }

    #[test]
    fn parses_schema_versions() {
        assert_eq!("legacy".parse::<SchemaVersion>().unwrap(), SchemaVersion::Legacy);
        assert_eq!(" Org-Unit ".parse::<SchemaVersion>().unwrap(), SchemaVersion::OrgUnit);
        assert!("v3".parse::<SchemaVersion>().is_err());
    }
}
