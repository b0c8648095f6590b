//! Migrates control-plane configuration between two deployments.

pub mod features;
pub mod services;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shared::{
    schemas::SchemaVersion,
    utilities::config::{Config, ConfigOverrides},
};
use tracing::{Level, info, warn};

use crate::features::handlers;

#[derive(Parser, Debug)]
#[command(name = "cluster-migrator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a snapshot or a live source into the destination
    Migrate(MigrateArgs),
    /// Capture every resource of the source into a snapshot directory
    Retrieve(RetrieveArgs),
}

#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<Level>,

    /// Snapshot directory, defaults to `{source-version}_cluster_json`
    #[arg(long, global = true)]
    pub snapshot_dir: Option<PathBuf>,

    /// Version label of the source deployment
    #[arg(long, global = true)]
    pub source_version: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    #[arg(long)]
    pub source_url: Option<String>,
    #[arg(long)]
    pub source_client_id: Option<String>,
    #[arg(long)]
    pub source_client_secret: Option<String>,
    #[arg(long)]
    pub source_cluster_id: Option<String>,
    /// Authenticate through this realm instead of the application token endpoint
    #[arg(long)]
    pub source_realm: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct DestinationArgs {
    #[arg(long)]
    pub destination_url: Option<String>,
    #[arg(long)]
    pub destination_client_id: Option<String>,
    #[arg(long)]
    pub destination_client_secret: Option<String>,
    #[arg(long)]
    pub destination_cluster_id: Option<String>,
    /// Authenticate through this realm instead of the application token endpoint
    #[arg(long)]
    pub destination_realm: Option<String>,
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub destination: DestinationArgs,

    /// Read from the live source instead of the snapshot directory
    #[arg(long)]
    pub live: bool,

    /// Creation payload shape expected by the destination (legacy, org-unit)
    #[arg(long)]
    pub target_schema: Option<SchemaVersion>,

    /// Point PVC datasources at their existing claims
    #[arg(long)]
    pub convert_storage: bool,

    /// Write the migration report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RetrieveArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

/// How a completed command ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunOutcome {
    Clean,
    /// The run finished but some resources were not migrated.
    PartialFailure,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            tracing_level: self.global.log_level,
            snapshot_dir: self.global.snapshot_dir.clone(),
            source_version: self.global.source_version.clone(),
            request_timeout_secs: self.global.request_timeout_secs,
            ..Default::default()
        };

        let source = match &self.command {
            Commands::Migrate(args) => &args.source,
            Commands::Retrieve(args) => &args.source,
        };
        overrides.source_url = source.source_url.clone();
        overrides.source_client_id = source.source_client_id.clone();
        overrides.source_client_secret = source.source_client_secret.clone();
        overrides.source_cluster_id = source.source_cluster_id.clone();
        overrides.source_realm = source.source_realm.clone();

        if let Commands::Migrate(args) = &self.command {
            overrides.destination_url = args.destination.destination_url.clone();
            overrides.destination_client_id = args.destination.destination_client_id.clone();
            overrides.destination_client_secret =
                args.destination.destination_client_secret.clone();
            overrides.destination_cluster_id = args.destination.destination_cluster_id.clone();
            overrides.destination_realm = args.destination.destination_realm.clone();
            overrides.target_schema = args.target_schema;
            // A bare flag can only switch the conversion on.
            overrides.convert_storage = args.convert_storage.then_some(true);
            overrides.report_path = args.report.clone();
        }

        overrides
    }

    pub async fn run(self, config: &Config) -> Result<RunOutcome> {
        match self.command {
            Commands::Migrate(args) => {
                let report = handlers::migrate(config, args.live)
                    .await
                    .context("migration aborted")?;

                for (kind, summary) in &report.kinds {
                    info!(
                        "{:<18} total {:>4} | created {:>4} | recovered {:>4} | skipped {:>4} | failed {:>4}",
                        kind.as_str(),
                        summary.total,
                        summary.created,
                        summary.recovered,
                        summary.skipped,
                        summary.failed
                    );
                }

                if report.has_failures() {
                    warn!("⚠️ {} resource(s) failed to migrate", report.failures.len());
                    Ok(RunOutcome::PartialFailure)
                } else {
                    info!("🎉 Migration finished without failures");
                    Ok(RunOutcome::Clean)
                }
            }
            Commands::Retrieve(_) => {
                let written = handlers::retrieve(config)
                    .await
                    .context("snapshot retrieval aborted")?;
                info!("📸 {} snapshot file(s) written", written.len());
                Ok(RunOutcome::Clean)
            }
        }
    }
}
