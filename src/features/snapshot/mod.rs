pub mod implementations;

pub use implementations::{SnapshotDir, snapshot_file};
