pub mod handlers;
pub mod replay;
pub mod resolver;
pub mod resources;
pub mod rewriter;
pub mod snapshot;
pub mod translator;
