//! What-if evaluation of one input over many values.
use crate::calculator::Calculator;
use crate::error::{EngineError, EngineResult};
use crate::store::{Direction, Value};
use crate::validation::Severity;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepOutput {
    pub id: String,
    pub raw_val: Value,
    pub severity: Severity,
}

/// One evaluated input value and the requested outputs it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub input: f64,
    pub outputs: Vec<SweepOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub input_id: String,
    pub points: Vec<SweepPoint>,
}

/// Evaluates `calc` once per display value of `input_id`, in parallel.
///
/// Every point runs on its own clone, so `calc` is never modified. Points
/// come back in the order of `values`.
pub fn sweep(calc: &Calculator, input_id: &str, values: &[f64], outputs: &[&str]) -> EngineResult<SweepResult> {
    use rayon::prelude::*;

    let input = calc.variable(input_id)?;
    if input.direction != Direction::Input {
        return Err(EngineError::invalid_op(input_id, "only inputs can be swept"));
    }
    for id in outputs {
        calc.variable(id)?;
    }

    let points: Vec<EngineResult<SweepPoint>> = values
        .par_iter()
        .map(|&value| {
            let mut point = calc.clone();
            point.set_input_number(input_id, value)?;
            let outputs = outputs
                .iter()
                .map(|id| {
                    let var = point.variable(id)?;
                    Ok(SweepOutput { id: var.id, raw_val: var.raw_val, severity: var.severity })
                })
                .collect::<EngineResult<Vec<_>>>()?;
            Ok(SweepPoint { input: value, outputs })
        })
        .collect();

    let points = points.into_iter().collect::<EngineResult<Vec<_>>>()?;
    debug!(calculator = calc.id(), input = input_id, points = points.len(), "sweep finished");
    Ok(SweepResult { input_id: input_id.to_string(), points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CalculatorDef, VariableDef};
    use crate::units::NumberUnit;
    use crate::validation::{above, is_number};

    fn doubler() -> Calculator {
        let unit = || NumberUnit::linear("u", 1.0).preferred();
        let def = CalculatorDef::new("double", "Double")
            .variable(VariableDef::input("x", "X").unit(unit()).validator(is_number(Severity::Error)))
            .variable(
                VariableDef::output("y", "Y", |v| Ok(v.number("x")? * 2.0))
                    .unit(unit())
                    .validator(is_number(Severity::Error))
                    .validator(above(10.0, Severity::Warning, "Y is large.")),
            );
        Calculator::new(&def).unwrap()
    }

    #[test]
    fn test_sweep_keeps_order_and_leaves_calculator_untouched() {
        let calc = doubler();
        let before = calc.snapshot();
        let result = sweep(&calc, "x", &[1.0, 2.0, 8.0], &["y"]).unwrap();

        let ys: Vec<Value> = result.points.iter().map(|p| p.outputs[0].raw_val.clone()).collect();
        assert_eq!(ys, vec![Value::Number(2.0), Value::Number(4.0), Value::Number(16.0)]);
        assert_eq!(result.points[2].outputs[0].severity, Severity::Warning);
        assert_eq!(calc.snapshot(), before);
    }

    #[test]
    fn test_sweep_rejects_outputs_and_unknown_ids() {
        let calc = doubler();
        assert!(matches!(sweep(&calc, "y", &[1.0], &["x"]), Err(EngineError::InvalidOperation { .. })));
        assert!(matches!(sweep(&calc, "x", &[1.0], &["z"]), Err(EngineError::UnknownVariable(_))));
    }
}
