//! Reactive variable engine for engineering calculators.
//!
//! A [`Calculator`] holds named inputs and outputs joined by equations and
//! unit systems. Every mutation recomputes the affected outputs in dependency
//! order and re-runs validation before it returns.

pub mod calculator;
pub mod calculators;
pub mod computation;
pub mod error;
pub mod graph;
pub mod store;
pub mod sweep;
pub mod units;
pub mod validation;

pub use calculator::{Calculator, CalculatorSnapshot};
pub use error::{EngineError, EngineResult, EquationError};
pub use store::{CalculatorDef, Direction, Value, VariableDef, VariableSnapshot, Vars};
pub use sweep::{sweep, SweepOutput, SweepPoint, SweepResult};
pub use units::NumberUnit;
pub use validation::{Severity, ValidationOutcome, Validator};
