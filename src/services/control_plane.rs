use std::time::Duration;

use serde_json::Value;
use shared::{
    schemas::{SchemaVersion, unwrap_collection},
    services::control_plane::{ApiResponse, ControlPlaneClient},
    utilities::{config::ClusterConfig, errors::AppError},
};
use tracing::debug;

use crate::{
    features::{
        replay::{Destination, Source},
        resources::{ResourceKind, SubKind},
    },
    services::endpoints::{create_path, list_path},
};

/// One live deployment, bound to a cluster and the schema its creation endpoints speak.
pub struct ControlPlane {
    client: ControlPlaneClient,
    cluster_id: String,
    schema: SchemaVersion,
}

impl ControlPlane {
    pub async fn connect(
        cluster: &ClusterConfig,
        schema: SchemaVersion,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let cluster_id = cluster
            .cluster_id
            .map(|id| id.to_string())
            .ok_or_else(|| AppError::InvalidConfig {
                key: "CLUSTER_ID".to_string(),
                reason: format!("no cluster id configured for {}", cluster.base_url),
            })?;
        let client = ControlPlaneClient::connect(cluster, timeout).await?;

        Ok(Self {
            client,
            cluster_id,
            schema,
        })
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    async fn list_kind(&self, kind: ResourceKind) -> Result<Vec<Value>, AppError> {
        let path = list_path(kind, &self.cluster_id);
        let response = self.client.get(&path).await?;
        if !response.is_success() {
            return Err(AppError::ListingFailed {
                kind: kind.to_string(),
                status: response.status,
                body: response.body,
            });
        }
        let items = unwrap_collection(response.json()?)?;
        debug!("listed {} {} resource(s) from {}", items.len(), kind, self.client.base_url());
        Ok(items)
    }
}

impl Source for ControlPlane {
    async fn fetch(&self, kind: ResourceKind) -> Result<Vec<Value>, AppError> {
        self.list_kind(kind).await
    }
}

impl Destination for ControlPlane {
    async fn create(
        &self,
        kind: ResourceKind,
        sub_kind: Option<&SubKind>,
        payload: &Value,
    ) -> Result<ApiResponse, AppError> {
        let path = create_path(kind, sub_kind, &self.cluster_id, self.schema);
        self.client.post(&path, payload).await
    }

    async fn list(&self, kind: ResourceKind) -> Result<Vec<Value>, AppError> {
        self.list_kind(kind).await
    }
}
