//! Variable model: values, live variables and the definitions they are built from.
pub mod definition;
pub mod types;
pub mod variable;

pub use definition::{CalculatorDef, VariableDef};
pub use types::{format_engineering, format_significant, Direction, Value};
pub use variable::{EquationFn, Formula, Kind, Role, Variable, VariableSnapshot, Vars};
