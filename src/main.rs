use std::process::ExitCode;

use clap::Parser;
use shared::utilities::config::Config;
use tracing::{Level, error};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cluster_migrator::{Cli, RunOutcome};

fn init_tracing(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::init(cli.overrides()).await {
        Ok(config) => config,
        Err(e) => {
            init_tracing(Level::INFO);
            error!("❌ Invalid configuration: {}", e);
            return ExitCode::from(1);
        }
    };
    init_tracing(config.tracing_level);

    match cli.run(&config).await {
        Ok(RunOutcome::Clean) => ExitCode::SUCCESS,
        Ok(RunOutcome::PartialFailure) => ExitCode::from(2),
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::from(1)
        }
    }
}
