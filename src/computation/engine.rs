//! A synchronous, single-threaded recalculation engine.
use crate::error::{EngineResult, EquationError};
use crate::graph::DependencyGraph;
use crate::store::{Value, Variable, Vars};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, trace, warn};

/// What a recompute pass did. Failed equations are recovered, not raised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecalcReport {
    pub evaluated: usize,
    pub failed: Vec<(String, EquationError)>,
}

pub struct RecalcEngine<'a> {
    graph: &'a DependencyGraph,
}

impl<'a> RecalcEngine<'a> {
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    /// Evaluates outputs in dependency order, each exactly once.
    ///
    /// With a `scope`, only those outputs are evaluated; the rest keep their
    /// value. `vars` is the caller's working copy, so earlier outputs in the
    /// order are visible to later ones.
    pub fn run(&self, vars: &mut [Variable], scope: Option<&HashSet<usize>>) -> EngineResult<RecalcReport> {
        let mut order = self.graph.evaluation_order()?;
        if let Some(scope) = scope {
            order.retain(|pos| scope.contains(pos));
        }
        let report = self.evaluate_in_order(vars, &order);
        debug!(evaluated = report.evaluated, failed = report.failed.len(), "recompute pass finished");
        Ok(report)
    }

    /// Evaluates `order` as given. Callers are responsible for it being a
    /// valid topological order.
    pub(crate) fn evaluate_in_order(&self, vars: &mut [Variable], order: &[usize]) -> RecalcReport {
        let mut report = RecalcReport::default();
        for &pos in order {
            let result = self.evaluate(vars, pos);
            let value = match result {
                Ok(v) => Value::Number(v),
                Err(e) => {
                    warn!(variable = %vars[pos].id, error = %e, "equation failed, output unset");
                    report.failed.push((vars[pos].id.clone(), e));
                    Value::Unset
                }
            };
            trace!(variable = %vars[pos].id, ?value, "output evaluated");
            vars[pos].set_raw(value);
            report.evaluated += 1;
        }
        report
    }

    fn evaluate(&self, vars: &[Variable], pos: usize) -> Result<f64, EquationError> {
        let Some(formula) = vars[pos].formula() else {
            return Err(EquationError::Domain(format!("'{}' is not an output", vars[pos].id)));
        };
        let view = Vars::restricted(vars, self.graph.dependencies(pos));
        // The view is read-only, so a panicking equation leaves nothing half-written.
        let value = catch_unwind(AssertUnwindSafe(|| formula.evaluate(&view)))
            .map_err(|_| EquationError::Domain("equation panicked".into()))??;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EquationError::NonFinite { value })
        }
    }
}
