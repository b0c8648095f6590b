pub mod implementations;
pub mod models;

pub use implementations::{Destination, ReplayDriver, Source, run_migration};
pub use models::{KindSummary, MigrationReport, ReplayState};
