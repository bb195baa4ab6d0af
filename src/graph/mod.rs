//! Dependency discovery and evaluation ordering for calculator outputs.
pub mod dag;

pub use dag::{DependencyGraph, Deps};
