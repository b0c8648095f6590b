pub mod implementations;
pub mod rules;

pub use implementations::{Translated, TranslationContext, translate};
