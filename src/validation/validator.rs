//! Validator chains: ordered predicates whose worst outcome becomes the
//! variable's severity and message.
use crate::store::{Value, Vars};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Ordered validation outcome, `Ok < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Error,
}

/// The aggregate result of one variable's validator chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub severity: Severity,
    /// Message of the first validator producing `severity`. `None` when Ok.
    pub message: Option<String>,
}

pub type Predicate = Arc<dyn Fn(&Vars<'_>, &Value) -> Severity + Send + Sync>;

/// A single predicate and the message shown when it fires.
///
/// The predicate receives a read-only view of the calculator and the raw
/// value of the variable it is attached to.
#[derive(Clone)]
pub struct Validator {
    predicate: Predicate,
    message: String,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("message", &self.message).finish_non_exhaustive()
    }
}

impl Validator {
    pub fn new(
        message: impl Into<String>,
        predicate: impl Fn(&Vars<'_>, &Value) -> Severity + Send + Sync + 'static,
    ) -> Self {
        Self { predicate: Arc::new(predicate), message: message.into() }
    }

    pub fn message(&self) -> &str { &self.message }

    pub fn check(&self, vars: &Vars<'_>, own: &Value) -> Severity {
        (self.predicate)(vars, own)
    }
}

/// Runs a chain in declaration order. Ties on the worst severity go to the
/// earliest validator.
pub fn evaluate_chain(chain: &[Validator], vars: &Vars<'_>, own: &Value) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();
    for validator in chain {
        let severity = validator.check(vars, own);
        if severity > outcome.severity {
            outcome = ValidationOutcome { severity, message: Some(validator.message.clone()) };
        }
    }
    outcome
}
