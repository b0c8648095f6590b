use std::{path::PathBuf, time::Duration};

use shared::{
    schemas::SchemaVersion,
    utilities::{config::Config, errors::AppError},
};
use tracing::info;

use crate::{
    features::{
        replay::{MigrationReport, Source, run_migration},
        resources::REPLAY_ORDER,
        snapshot::SnapshotDir,
        translator::TranslationContext,
    },
    services::control_plane::ControlPlane,
};

// ============================================
// MIGRATE
// ============================================

/// Replays every kind into the destination, reading from the live source or the snapshot.
pub async fn migrate(config: &Config, live_source: bool) -> Result<MigrationReport, AppError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let destination =
        ControlPlane::connect(config.require_destination()?, config.target_schema, timeout).await?;

    let context = TranslationContext {
        target: config.target_schema,
        destination_cluster_id: destination.cluster_id().to_string(),
        convert_storage: config.convert_storage,
    };
    let source_cluster_id = config.source_cluster_id.map(|id| id.to_string());

    info!(
        "🚚 Migrating into {} using the {} schema",
        destination.cluster_id(),
        config.target_schema
    );

    let report = if live_source {
        let source =
            ControlPlane::connect(config.require_source()?, SchemaVersion::default(), timeout)
                .await?;
        run_migration(&source, &destination, context, source_cluster_id).await?
    } else {
        let snapshot = SnapshotDir::new(&config.snapshot_dir);
        info!("📂 Reading source resources from {}", snapshot.root().display());
        run_migration(&snapshot, &destination, context, source_cluster_id).await?
    };

    if let Some(path) = &config.report_path {
        report.write_to(path).await?;
        info!("📝 Migration report written to {}", path.display());
    }

    Ok(report)
}

// ============================================
// RETRIEVE
// ============================================

/// Captures every kind from the source into the snapshot directory.
pub async fn retrieve(config: &Config) -> Result<Vec<PathBuf>, AppError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let source =
        ControlPlane::connect(config.require_source()?, SchemaVersion::default(), timeout).await?;
    let snapshot = SnapshotDir::new(&config.snapshot_dir);

    let mut written = Vec::with_capacity(REPLAY_ORDER.len());
    for kind in REPLAY_ORDER {
        let items = source.fetch(kind).await?;
        written.push(snapshot.store(kind, &items).await?);
    }

    info!(
        "📸 Snapshot of {} written to {}",
        source.cluster_id(),
        snapshot.root().display()
    );
    Ok(written)
}
