pub mod models;
pub mod paths;

pub use models::{IdSpace, Identifier, REPLAY_ORDER, ResourceKind, SubKind};
