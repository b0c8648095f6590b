use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, ser::PrettyFormatter};
use shared::{schemas::unwrap_collection, utilities::errors::AppError};
use tokio::fs;
use tracing::{info, warn};

use crate::features::{replay::Source, resources::ResourceKind};

/// File a kind is stored under inside a snapshot directory.
pub fn snapshot_file(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::NodePool => "node_pools.json",
        ResourceKind::Department => "departments.json",
        ResourceKind::Project => "projects.json",
        ResourceKind::NodeType => "node_types.json",
        ResourceKind::AccessRule => "access_rules.json",
        ResourceKind::Environment => "environment.json",
        ResourceKind::Compute => "compute.json",
        ResourceKind::Credential => "credentials.json",
        ResourceKind::Datasource => "datasource.json",
        ResourceKind::WorkloadTemplate => "workload-template.json",
    }
}

/// A directory of per-kind JSON files captured from a source deployment.
#[derive(Clone, Debug)]
pub struct SnapshotDir {
    root: PathBuf,
}

impl SnapshotDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, kind: ResourceKind) -> PathBuf {
        self.root.join(snapshot_file(kind))
    }

    /// Loads one kind. A missing file is an empty collection, malformed JSON is fatal.
    pub async fn load(&self, kind: ResourceKind) -> Result<Vec<Value>, AppError> {
        let path = self.path_of(kind);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            warn!("⚠️ Snapshot file {} not found, no {} to migrate", path.display(), kind);
            return Ok(Vec::new());
        }

        let read_failure = |reason: String| AppError::SnapshotReadFailure {
            path: path.clone(),
            reason,
        };
        let text = fs::read_to_string(&path)
            .await
            .map_err(|e| read_failure(e.to_string()))?;
        let value: Value = serde_json::from_str(&text).map_err(|e| read_failure(e.to_string()))?;
        unwrap_collection(value).map_err(|e| read_failure(e.to_string()))
    }

    /// Writes one kind with 4-space indentation, creating the directory if needed.
    pub async fn store(&self, kind: ResourceKind, items: &[Value]) -> Result<PathBuf, AppError> {
        let path = self.path_of(kind);
        let write_failure = |reason: String| AppError::SnapshotWriteFailure {
            path: path.clone(),
            reason,
        };

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| write_failure(e.to_string()))?;

        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        items
            .serialize(&mut serializer)
            .map_err(|e| write_failure(e.to_string()))?;

        fs::write(&path, buffer)
            .await
            .map_err(|e| write_failure(e.to_string()))?;

        info!("💾 Wrote {} {} resource(s) to {}", items.len(), kind, path.display());
        Ok(path)
    }
}

impl Source for SnapshotDir {
    async fn fetch(&self, kind: ResourceKind) -> Result<Vec<Value>, AppError> {
        self.load(kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn missing_files_are_empty_collections() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotDir::new(dir.path());
        assert!(snapshot.load(ResourceKind::Project).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_files_abort() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("projects.json"), "[{\"name\": ").unwrap();
        let err = SnapshotDir::new(dir.path())
            .load(ResourceKind::Project)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, AppError::SnapshotReadFailure { .. }));
    }

    #[tokio::test]
    async fn access_rule_envelope_is_unwrapped_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("access_rules.json"),
            r#"{"totalRecords": 2, "accessRules": [{"id": 2}, {"id": 1}]}"#,
        )
        .unwrap();
        let rules = SnapshotDir::new(dir.path())
            .fetch(ResourceKind::AccessRule)
            .await
            .unwrap();
        assert_eq!(rules, vec![json!({"id": 2}), json!({"id": 1})]);
    }

    #[tokio::test]
    async fn stored_snapshots_use_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotDir::new(dir.path().join("2.16_cluster_json"));
        let path = snapshot
            .store(ResourceKind::NodePool, &[json!({"name": "gpu-pool"})])
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n        \"name\": \"gpu-pool\""));
        assert_eq!(
            snapshot.load(ResourceKind::NodePool).await.unwrap(),
            vec![json!({"name": "gpu-pool"})]
        );
    }
}
