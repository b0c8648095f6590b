use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use shared::{services::control_plane::ApiResponse, utilities::errors::AppError};
use tracing::{debug, error, info, warn};

use crate::features::{
    replay::models::{FailureRecord, MigrationReport, ReplayState},
    resolver::IdentityResolver,
    resources::{IdSpace, Identifier, REPLAY_ORDER, ResourceKind, SubKind, paths},
    rewriter::rewrite,
    translator::{TranslationContext, translate},
};

// ============================================
// SEAMS
// ============================================

/// Supplies the raw source collection of a kind, in stored order.
#[allow(async_fn_in_trait)]
pub trait Source {
    async fn fetch(&self, kind: ResourceKind) -> Result<Vec<Value>, AppError>;
}

/// Receives creation payloads and answers listings of what it already holds.
#[allow(async_fn_in_trait)]
pub trait Destination {
    async fn create(
        &self,
        kind: ResourceKind,
        sub_kind: Option<&SubKind>,
        payload: &Value,
    ) -> Result<ApiResponse, AppError>;

    async fn list(&self, kind: ResourceKind) -> Result<Vec<Value>, AppError>;
}

/// Name every deployment gives its implicit node pool and department.
pub const IMPLICIT_DEFAULT: &str = "default";

// ============================================
// DRIVER
// ============================================

pub struct ReplayDriver<'a, D: Destination> {
    destination: &'a D,
    context: TranslationContext,
    source_cluster_id: Option<String>,
    resolver: IdentityResolver,
    report: MigrationReport,
}

/// Why an instance did not reach the destination.
struct Failure {
    error: AppError,
    payload: Option<Value>,
}

impl Failure {
    fn new(error: AppError, payload: Option<Value>) -> Self {
        Self { error, payload }
    }
}

impl<'a, D: Destination> ReplayDriver<'a, D> {
    pub fn new(
        destination: &'a D,
        context: TranslationContext,
        source_cluster_id: Option<String>,
    ) -> Self {
        let resolver = IdentityResolver::new(context.destination_cluster_id.clone());
        let report = MigrationReport::new(context.target);
        Self {
            destination,
            context,
            source_cluster_id,
            resolver,
            report,
        }
    }

    /// Seeds the name tables from what the destination already holds.
    pub async fn prime(&mut self) {
        for kind in REPLAY_ORDER {
            match self.destination.list(kind).await {
                Ok(items) => {
                    let mut by_space: HashMap<IdSpace, Vec<(String, Identifier)>> = HashMap::new();
                    for item in &items {
                        if let (Some(name), Some(id)) = (kind.name_key(item), kind.id_of(item)) {
                            by_space.entry(kind.space_of(item)).or_default().push((name, id));
                        }
                    }
                    let seeded: usize = by_space
                        .into_iter()
                        .map(|(space, entries)| self.resolver.seed_names(&space, entries))
                        .sum();
                    debug!("seeded {} destination {} name(s)", seeded, kind);
                }
                Err(e) => warn!("⚠️ Could not list destination {}: {}", kind, e),
            }
        }
    }

    /// Runs one source instance to a terminal state. Only fatal errors are returned.
    pub async fn replay(&mut self, kind: ResourceKind, item: &Value) -> Result<ReplayState, AppError> {
        let label = kind
            .display_name(item)
            .unwrap_or_else(|| "<unnamed>".to_string());
        debug!("{} '{}' -> {}", kind, label, ReplayState::Pending);

        let state = match self.advance(kind, item, &label).await {
            Ok(state) => state,
            Err(failure) if failure.error.is_fatal() => return Err(failure.error),
            Err(failure) => {
                match &failure.payload {
                    Some(payload) => error!(
                        "❌ Failed to migrate {} '{}': {}, payload: {}",
                        kind, label, failure.error, payload
                    ),
                    None => error!("❌ Failed to migrate {} '{}': {}", kind, label, failure.error),
                }
                self.report.failures.push(FailureRecord {
                    kind,
                    name: label.clone(),
                    reason: failure.error.to_string(),
                    payload: failure.payload,
                });
                ReplayState::Failed
            }
        };

        debug!("{} '{}' -> {}", kind, label, state);
        self.report.record(kind, state);
        Ok(state)
    }

    async fn advance(
        &mut self,
        kind: ResourceKind,
        item: &Value,
        label: &str,
    ) -> Result<ReplayState, Failure> {
        if kind.has_implicit_default() && label == IMPLICIT_DEFAULT {
            self.link_default(kind, item);
            info!("⏭️ Skipping implicit {} '{}'", kind, label);
            return Ok(ReplayState::Skipped);
        }
        if kind == ResourceKind::AccessRule && self.belongs_to_other_cluster(item) {
            info!("⏭️ Skipping access rule '{}' from another source cluster", label);
            return Ok(ReplayState::Skipped);
        }

        debug!("{} '{}' -> {}", kind, label, ReplayState::Translating);
        let translated = translate(kind, item, &self.context)
            .map_err(|e| Failure::new(e, Some(item.clone())))?;

        debug!("{} '{}' -> {}", kind, label, ReplayState::Rewriting);
        let payload = rewrite(kind, translated.payload.clone(), &self.resolver)
            .map_err(|e| Failure::new(e, Some(translated.payload)))?;

        debug!("{} '{}' -> {}", kind, label, ReplayState::Submitting);
        let sub_kind = translated.sub_kind.as_ref();
        let response = match self.destination.create(kind, sub_kind, &payload).await {
            Ok(response) => response,
            Err(e) => return Err(Failure::new(e, Some(payload))),
        };

        let (state, new_id) = if response.is_success() {
            let body = response.json().unwrap_or(Value::Null);
            let new_id = match kind.id_of(&body) {
                Some(id) => id,
                None => self.find_existing(kind, &payload, label).await?,
            };
            info!("✅ Created {} '{}' ({})", kind, label, new_id);
            (ReplayState::Created, new_id)
        } else if is_already_exists(&response) {
            let new_id = self.find_existing(kind, &payload, label).await?;
            warn!("♻️ {} '{}' already exists, reusing {}", kind, label, new_id);
            (ReplayState::Recovered, new_id)
        } else {
            return Err(Failure::new(
                AppError::DestinationRejected {
                    kind: kind.to_string(),
                    status: response.status,
                    body: response.body,
                },
                Some(payload),
            ));
        };

        self.register(kind, item, &payload, new_id);
        Ok(state)
    }

    fn register(&mut self, kind: ResourceKind, item: &Value, payload: &Value, new_id: Identifier) {
        let space = kind.space_of(item);
        if let Some(old_id) = kind.id_of(item) {
            self.resolver.register(&space, old_id, new_id.clone());
        }
        if let Some(name) = kind.name_key(payload) {
            self.resolver.register_name(&space, name, new_id);
        }
    }

    /// Links the source's implicit default to the destination's own default.
    fn link_default(&mut self, kind: ResourceKind, item: &Value) {
        let space = IdSpace::of(kind);
        let Some(old_id) = kind.id_of(item) else {
            return;
        };
        match self.resolver.resolve_by_name(&space, IMPLICIT_DEFAULT) {
            Ok(new_id) => {
                self.resolver.register(&space, old_id, new_id);
            }
            Err(_) => warn!(
                "⚠️ Destination has no {} '{}', references to {} stay unresolved",
                kind, IMPLICIT_DEFAULT, old_id
            ),
        }
    }

    fn belongs_to_other_cluster(&self, item: &Value) -> bool {
        match (&self.source_cluster_id, paths::get_str(item, "clusterId")) {
            (Some(source), Some(cluster)) => !cluster.eq_ignore_ascii_case(source),
            _ => false,
        }
    }

    /// Looks the payload up in a fresh destination listing by its natural key.
    async fn find_existing(
        &self,
        kind: ResourceKind,
        payload: &Value,
        label: &str,
    ) -> Result<Identifier, Failure> {
        let already_exists = || AppError::AlreadyExists {
            kind: kind.to_string(),
            name: label.to_string(),
        };
        let Some(key) = kind.natural_key(payload) else {
            return Err(Failure::new(already_exists(), Some(payload.clone())));
        };
        // A broken listing only costs this instance.
        let listing = self.destination.list(kind).await.map_err(|e| {
            Failure::new(
                AppError::RecoveryFailed {
                    kind: kind.to_string(),
                    name: label.to_string(),
                    reason: e.to_string(),
                },
                Some(payload.clone()),
            )
        })?;

        listing
            .iter()
            .find(|existing| kind.natural_key(existing).as_deref() == Some(key.as_str()))
            .and_then(|existing| kind.id_of(existing))
            .ok_or_else(|| Failure::new(already_exists(), Some(payload.clone())))
    }

    pub fn finish(mut self) -> MigrationReport {
        self.report.finished_at = Some(Utc::now());
        self.report.id_maps = self.resolver.id_maps();
        self.report
    }
}

fn is_already_exists(response: &ApiResponse) -> bool {
    response.status == 409 && response.body.to_ascii_lowercase().contains("already exists")
}

/// Replays every kind in dependency order. Source read failures abort the run.
pub async fn run_migration<S, D>(
    source: &S,
    destination: &D,
    context: TranslationContext,
    source_cluster_id: Option<String>,
) -> Result<MigrationReport, AppError>
where
    S: Source,
    D: Destination,
{
    let mut driver = ReplayDriver::new(destination, context, source_cluster_id);
    driver.prime().await;

    for kind in REPLAY_ORDER {
        let items = source.fetch(kind).await?;
        info!("📦 Replaying {} {} resource(s)", items.len(), kind);
        for item in &items {
            driver.replay(kind, item).await?;
        }
        let summary = driver.report.summary(kind);
        info!(
            "{}: {} created, {} recovered, {} skipped, {} failed",
            kind, summary.created, summary.recovered, summary.skipped, summary.failed
        );
    }

    Ok(driver.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_detection_needs_both_status_and_message() {
        let conflict = ApiResponse {
            status: 409,
            body: r#"{"message":"Project vision Already Exists"}"#.to_string(),
        };
        let other_conflict = ApiResponse {
            status: 409,
            body: "quota exceeded".to_string(),
        };
        let bad_request = ApiResponse {
            status: 400,
            body: "already exists".to_string(),
        };
        assert!(is_already_exists(&conflict));
        assert!(!is_already_exists(&other_conflict));
        assert!(!is_already_exists(&bad_request));
    }
}
