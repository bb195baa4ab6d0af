//! Error types for the calculator engine.
//!
//! `EngineError` covers structural problems a caller must react to (bad
//! definitions, wrong-direction mutations, cycles). `EquationError` never
//! leaves the engine: it is recovered locally by marking the output unset.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The calculator or one of its variables is malformed. Fatal at construction.
    #[error("Configuration error in '{scope}': {reason}")]
    Configuration { scope: String, reason: String },

    #[error("Unknown unit '{unit}' for variable '{variable}'")]
    UnknownUnit { variable: String, unit: String },

    /// A mutation was attempted that the variable's current state does not allow.
    #[error("Invalid operation on '{variable}': {reason}")]
    InvalidOperation { variable: String, reason: String },

    #[error("Cyclic dependency detected: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),
}

impl EngineError {
    pub(crate) fn config(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration { scope: scope.into(), reason: reason.into() }
    }

    pub(crate) fn invalid_op(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOperation { variable: variable.into(), reason: reason.into() }
    }
}

/// Failure raised while evaluating a single output equation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EquationError {
    #[error("Variable '{variable}' is unset")]
    Unset { variable: String },
    #[error("Variable '{variable}' does not hold a number")]
    NotANumber { variable: String },
    #[error("Variable '{variable}' does not hold text")]
    NotText { variable: String },
    #[error("Variable '{variable}' is not a declared dependency")]
    Undeclared { variable: String },
    #[error("Unknown variable '{variable}'")]
    UnknownVariable { variable: String },
    #[error("Equation produced a non-finite result: {value}")]
    NonFinite { value: f64 },
    #[error("Domain error: {0}")]
    Domain(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_path() {
        let err = EngineError::CyclicDependency { cycle: vec!["b".into(), "c".into(), "b".into()] };
        assert_eq!(err.to_string(), "Cyclic dependency detected: b -> c -> b");
    }

    #[test]
    fn test_configuration_message() {
        let err = EngineError::config("ohms_law", "duplicate variable id 'voltage'");
        assert!(err.to_string().contains("ohms_law"));
        assert!(err.to_string().contains("duplicate"));
    }
}
