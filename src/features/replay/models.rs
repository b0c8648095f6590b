use std::{collections::BTreeMap, fmt, path::Path};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shared::{schemas::SchemaVersion, utilities::errors::AppError};
use tokio::fs;

use crate::features::resources::ResourceKind;

/// Lifecycle of a single resource instance during replay.
#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum ReplayState {
    Pending,
    Translating,
    Rewriting,
    Submitting,
    Created,
    Recovered,
    Skipped,
    Failed,
}

impl ReplayState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Recovered | Self::Skipped | Self::Failed
        )
    }
}

impl fmt::Display for ReplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Translating => "translating",
            Self::Rewriting => "rewriting",
            Self::Submitting => "submitting",
            Self::Created => "created",
            Self::Recovered => "recovered",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Serialize, Clone, Default, PartialEq, Eq, Debug)]
pub struct KindSummary {
    pub total: usize,
    pub created: usize,
    pub recovered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl KindSummary {
    pub fn record(&mut self, state: ReplayState) {
        self.total += 1;
        match state {
            ReplayState::Created => self.created += 1,
            ReplayState::Recovered => self.recovered += 1,
            ReplayState::Skipped => self.skipped += 1,
            ReplayState::Failed => self.failed += 1,
            _ => {}
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct FailureRecord {
    pub kind: ResourceKind,
    pub name: String,
    pub reason: String,
    pub payload: Option<Value>,
}

#[derive(Serialize, Clone, Debug)]
pub struct MigrationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub target_schema: SchemaVersion,
    pub kinds: BTreeMap<ResourceKind, KindSummary>,
    pub failures: Vec<FailureRecord>,
    pub id_maps: BTreeMap<String, BTreeMap<String, String>>,
}

impl MigrationReport {
    pub fn new(target_schema: SchemaVersion) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            target_schema,
            kinds: BTreeMap::new(),
            failures: Vec::new(),
            id_maps: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, kind: ResourceKind, state: ReplayState) {
        self.kinds.entry(kind).or_default().record(state);
    }

    pub fn summary(&self, kind: ResourceKind) -> KindSummary {
        self.kinds.get(&kind).cloned().unwrap_or_default()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string_pretty(self)?;
        fs::write(path, body).await?;
        Ok(())
    }
}
