#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Mutex,
};

use cluster_migrator::features::{
    replay::{Destination, Source},
    resources::{ResourceKind, SubKind},
    snapshot::snapshot_file,
};
use serde_json::{Value, json};
use shared::{services::control_plane::ApiResponse, utilities::errors::AppError};

pub const SOURCE_CLUSTER: &str = "302809a4-d8e9-45be-b9ef-6eef5d793900";
pub const DESTINATION_CLUSTER: &str = "ba0cf6ed-23f2-4393-9611-4396a6243379";

/// One creation call as the destination received it.
#[derive(Clone, Debug)]
pub struct Submission {
    pub kind: ResourceKind,
    pub sub_kind: Option<String>,
    pub payload: Value,
    pub status: u16,
}

#[derive(Default)]
struct State {
    stored: HashMap<ResourceKind, Vec<Value>>,
    submissions: Vec<Submission>,
    rejected_names: HashSet<String>,
    failing_listings: HashSet<ResourceKind>,
    next_id: u64,
}

/// Destination control plane kept in memory. Ids are assigned sequentially and a
/// second creation with the same natural key answers 409 "already exists".
pub struct FakeDestination {
    state: Mutex<State>,
}

impl FakeDestination {
    pub fn new(next_id: u64) -> Self {
        let destination = Self {
            state: Mutex::new(State {
                next_id,
                ..Default::default()
            }),
        };
        destination.seed(ResourceKind::NodePool, json!({"id": 1, "name": "default"}));
        destination.seed(ResourceKind::Department, json!({"id": 2, "name": "default"}));
        destination
    }

    pub fn seed(&self, kind: ResourceKind, item: Value) {
        let mut state = self.state.lock().unwrap();
        state.stored.entry(kind).or_default().push(item);
    }

    pub fn reject(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.rejected_names.insert(name.to_string());
    }

    /// Listings of `kind` answer 503 from now on.
    pub fn fail_listing(&self, kind: ResourceKind) {
        let mut state = self.state.lock().unwrap();
        state.failing_listings.insert(kind);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submissions_of(&self, kind: ResourceKind) -> Vec<Submission> {
        self.submissions()
            .into_iter()
            .filter(|submission| submission.kind == kind)
            .collect()
    }

    pub fn clear_submissions(&self) {
        self.state.lock().unwrap().submissions.clear();
    }

    pub fn stored(&self, kind: ResourceKind) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .stored
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

impl Destination for FakeDestination {
    async fn create(
        &self,
        kind: ResourceKind,
        sub_kind: Option<&SubKind>,
        payload: &Value,
    ) -> Result<ApiResponse, AppError> {
        let mut state = self.state.lock().unwrap();
        let name = kind.display_name(payload).unwrap_or_default();
        let key = kind.natural_key(payload);

        let exists = state
            .stored
            .get(&kind)
            .is_some_and(|items| items.iter().any(|item| kind.natural_key(item) == key));

        let response = if state.rejected_names.contains(&name) {
            ApiResponse {
                status: 400,
                body: format!(r#"{{"message":"{name} is invalid"}}"#),
            }
        } else if exists {
            ApiResponse {
                status: 409,
                body: format!(r#"{{"code":409,"message":"{kind} {name} already exists"}}"#),
            }
        } else {
            let id = state.next_id;
            state.next_id += 1;
            let mut stored = payload.clone();
            if kind.is_asset() {
                stored["meta"]["id"] = Value::String(format!("asset-{id}"));
            } else {
                stored["id"] = Value::from(id);
            }
            state.stored.entry(kind).or_default().push(stored.clone());
            ApiResponse {
                status: 201,
                body: stored.to_string(),
            }
        };

        state.submissions.push(Submission {
            kind,
            sub_kind: sub_kind.map(|s| s.as_str().to_string()),
            payload: payload.clone(),
            status: response.status,
        });
        Ok(response)
    }

    async fn list(&self, kind: ResourceKind) -> Result<Vec<Value>, AppError> {
        if self.state.lock().unwrap().failing_listings.contains(&kind) {
            return Err(AppError::ListingFailed {
                kind: kind.to_string(),
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(self.stored(kind))
    }
}

/// Source collections held in memory.
#[derive(Default)]
pub struct MemorySource {
    items: HashMap<ResourceKind, Vec<Value>>,
}

impl MemorySource {
    pub fn with(mut self, kind: ResourceKind, items: Vec<Value>) -> Self {
        self.items.insert(kind, items);
        self
    }
}

impl Source for MemorySource {
    async fn fetch(&self, kind: ResourceKind) -> Result<Vec<Value>, AppError> {
        Ok(self.items.get(&kind).cloned().unwrap_or_default())
    }
}

pub fn write_snapshot_file(dir: &Path, kind: ResourceKind, contents: &Value) {
    let body = serde_json::to_string_pretty(contents).unwrap();
    std::fs::write(dir.join(snapshot_file(kind)), body).unwrap();
}

/// A small source deployment: two pools, two departments, one project and its access rules.
pub fn source_cluster() -> MemorySource {
    MemorySource::default()
        .with(
            ResourceKind::NodePool,
            vec![
                json!({"id": 10, "name": "default", "overProvisioningRatio": 1}),
                json!({
                    "id": 5,
                    "name": "gpu-pool",
                    "labelKey": "pool",
                    "labelValue": "gpu",
                    "placementStrategy": {"cpu": "spread", "gpu": "binpack"},
                    "status": "Ready"
                }),
            ],
        )
        .with(
            ResourceKind::Department,
            vec![
                json!({"id": 20, "name": "default", "nodePoolsResources": []}),
                json!({
                    "id": 3,
                    "name": "research",
                    "nodePoolsResources": [{
                        "id": "nr-1",
                        "nodePool": {"id": 5, "name": "gpu-pool"},
                        "gpu": {"deserved": 2, "maxAllowed": 4, "overQuotaWeight": 1}
                    }]
                }),
            ],
        )
        .with(
            ResourceKind::Project,
            vec![json!({
                "id": 17,
                "name": "vision",
                "departmentId": 3,
                "clusterUuid": SOURCE_CLUSTER,
                "defaultNodePools": null,
                "permissions": {"users": null, "groups": ["ml"], "applications": null},
                "nodeAffinity": null,
                "interactiveJobTimeLimitSecs": null,
                "nodePoolsResources": [{"nodePool": {"id": 5, "name": "gpu-pool"}, "gpu": {"deserved": 1}}]
            })],
        )
        .with(
            ResourceKind::AccessRule,
            vec![
                json!({
                    "id": 8,
                    "subjectType": "user",
                    "subjectId": "u1",
                    "roleId": 3,
                    "roleName": "ml-engineer",
                    "scopeType": "project",
                    "scopeId": "17",
                    "scopeName": "vision",
                    "clusterId": SOURCE_CLUSTER,
                    "createdAt": "2024-05-01T00:00:00Z"
                }),
                json!({
                    "id": 9,
                    "subjectType": "group",
                    "subjectId": "ops",
                    "roleId": 1,
                    "scopeType": "cluster",
                    "scopeId": "11111111-2222-3333-4444-555555555555",
                    "clusterId": "11111111-2222-3333-4444-555555555555"
                }),
            ],
        )
        .with(
            ResourceKind::Credential,
            vec![json!({
                "meta": {"id": "c-1", "name": "prod-key", "scope": "tenant", "kind": "AccessKey"},
                "spec": {"accessKey": {"accessKeyId": "AKIA"}}
            })],
        )
}
