pub mod implementations;
pub mod rules;

pub use implementations::rewrite;
