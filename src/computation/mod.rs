//! Recomputes outputs over the dependency graph.
pub mod engine;

pub use engine::{RecalcEngine, RecalcReport};
