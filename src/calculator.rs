//! The calculator: owns its variables and exposes every mutation as an
//! all-or-nothing operation.
//!
//! Each mutation clones the variables into a working copy, rebuilds the
//! dependency graph, recomputes, validates, and only then commits. An error
//! at any step drops the working copy and leaves the calculator untouched.

use crate::computation::RecalcEngine;
use crate::error::{EngineError, EngineResult};
use crate::graph::DependencyGraph;
use crate::store::{CalculatorDef, Kind, Role, Value, Variable, VariableSnapshot, Vars};
use crate::validation::{evaluate_chain, ValidationOutcome};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Calculator {
    id: String,
    display_name: String,
    description: String,
    tags: BTreeSet<String>,
    vars: Vec<Variable>,
}

/// Serializable view of a whole calculator, for host state containers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculatorSnapshot {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub variables: Vec<VariableSnapshot>,
}

impl Calculator {
    /// Validates `def`, computes every output and validates every variable.
    pub fn new(def: &CalculatorDef) -> EngineResult<Self> {
        let vars = def.build_variables()?;
        let mut calc = Self {
            id: def.id.clone(),
            display_name: def.display_name.clone(),
            description: def.description.clone(),
            tags: def.tags.clone(),
            vars,
        };
        calc.recalc_all()?;
        debug!(calculator = %calc.id, variables = calc.vars.len(), "calculator created");
        Ok(calc)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn display_name(&self) -> &str { &self.display_name }
    pub fn description(&self) -> &str { &self.description }
    pub fn tags(&self) -> &BTreeSet<String> { &self.tags }

    // --- Queries ---

    pub fn variable(&self, id: &str) -> EngineResult<VariableSnapshot> {
        Ok(self.vars[self.position(id)?].snapshot())
    }

    /// All variables in declaration order.
    pub fn variables(&self) -> Vec<VariableSnapshot> {
        self.vars.iter().map(Variable::snapshot).collect()
    }

    pub fn snapshot(&self) -> CalculatorSnapshot {
        CalculatorSnapshot {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            variables: self.variables(),
        }
    }

    /// Ids of the variables `id` currently reads. Empty for inputs.
    pub fn dependencies(&self, id: &str) -> EngineResult<Vec<String>> {
        let pos = self.position(id)?;
        let graph = DependencyGraph::build(&self.vars)?;
        Ok(self.ids(graph.dependencies(pos)))
    }

    /// Ids of the outputs that currently read `id`.
    pub fn dependents(&self, id: &str) -> EngineResult<Vec<String>> {
        let pos = self.position(id)?;
        let graph = DependencyGraph::build(&self.vars)?;
        Ok(self.ids(&graph.dependents(pos)))
    }

    // --- Mutations ---

    /// Sets an input from user-entered text in its selected unit.
    ///
    /// Numeric text that does not parse leaves the input `Unset`. Choice
    /// variables only accept one of their options. The input is marked as
    /// being edited until `finish_edit`.
    pub fn set_input_value(&mut self, id: &str, text: &str) -> EngineResult<()> {
        let pos = self.position(id)?;
        self.apply(|vars| {
            let var = &mut vars[pos];
            let display = match &var.kind {
                Kind::Numeric { .. } => Value::parse_number(text),
                Kind::Choice { options } => {
                    let choice = text.trim();
                    if !options.iter().any(|o| o == choice) {
                        return Err(EngineError::invalid_op(
                            &var.id,
                            format!("'{}' is not one of {:?}", choice, options),
                        ));
                    }
                    Value::Text(choice.to_string())
                }
            };
            set_input(var, display)?;
            recompute(vars, Some(pos))
        })
    }

    /// Typed variant of [`Calculator::set_input_value`] for numeric inputs.
    pub fn set_input_number(&mut self, id: &str, display: f64) -> EngineResult<()> {
        let pos = self.position(id)?;
        self.apply(|vars| {
            if matches!(vars[pos].kind, Kind::Choice { .. }) {
                return Err(EngineError::invalid_op(id, "choice variables take one of their options as text"));
            }
            set_input(&mut vars[pos], Value::from_number(display))?;
            recompute(vars, Some(pos))
        })
    }

    /// Selects another unit for a numeric variable.
    ///
    /// While an input is being edited its display value is kept and the raw
    /// value is re-derived, so dependents are recomputed. Otherwise only the
    /// display value changes.
    pub fn set_unit(&mut self, id: &str, label: &str) -> EngineResult<()> {
        let pos = self.position(id)?;
        self.apply(|vars| {
            let var = &mut vars[pos];
            var.select_unit(label)?;
            if var.is_editing() {
                let display = var.disp_val.clone();
                var.set_display(display);
                recompute(vars, Some(pos))
            } else {
                let raw = var.raw_val.clone();
                var.set_raw(raw);
                Ok(())
            }
        })
    }

    /// Selects the variable's default unit again.
    pub fn reset_unit(&mut self, id: &str) -> EngineResult<()> {
        let pos = self.position(id)?;
        let label = self.vars[pos]
            .default_unit_label()
            .ok_or_else(|| EngineError::invalid_op(id, "variable has no units"))?;
        self.set_unit(id, &label)
    }

    /// Ends the edit session of an input. Later unit switches only change
    /// its display value.
    pub fn finish_edit(&mut self, id: &str) -> EngineResult<()> {
        let pos = self.position(id)?;
        match &mut self.vars[pos].role {
            Role::Input { editing, .. } => {
                *editing = false;
                Ok(())
            }
            Role::Output(_) => Err(EngineError::invalid_op(id, "outputs are never edited")),
        }
    }

    /// Makes `id` the output of its solve group; the previous output becomes
    /// an input holding its last computed value.
    pub fn set_output(&mut self, id: &str) -> EngineResult<()> {
        let pos = self.position(id)?;
        let group = self.vars[pos]
            .group
            .clone()
            .ok_or_else(|| EngineError::invalid_op(id, "variable is not part of a solve group"))?;

        self.apply(|vars| {
            for (i, var) in vars.iter_mut().enumerate() {
                if var.group.as_deref() != Some(group.as_str()) {
                    continue;
                }
                let role = std::mem::replace(&mut var.role, Role::Input { editing: false, dormant: None });
                var.role = match (role, i == pos) {
                    (Role::Input { dormant: Some(formula), .. }, true) => Role::Output(formula),
                    (Role::Output(formula), false) => Role::Input { editing: false, dormant: Some(formula) },
                    (role, _) => role,
                };
            }
            debug!(variable = id, group = %group, "solve-for target changed");
            recompute(vars, None)
        })
    }

    // --- Bulk ---

    /// Recomputes every output from the current inputs.
    pub fn recalc_all(&mut self) -> EngineResult<()> {
        self.apply(|vars| recompute(vars, None))
    }

    /// Re-runs every validator chain and returns the outcomes by id.
    pub fn validate_all(&mut self) -> EngineResult<BTreeMap<String, ValidationOutcome>> {
        validate(&self.id, &mut self.vars)?;
        Ok(self.vars.iter().map(|v| (v.id.clone(), v.outcome.clone())).collect())
    }

    // --- Internals ---

    fn position(&self, id: &str) -> EngineResult<usize> {
        self.vars
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| EngineError::UnknownVariable(id.to_string()))
    }

    fn ids(&self, positions: &[usize]) -> Vec<String> {
        positions.iter().map(|&p| self.vars[p].id.clone()).collect()
    }

    fn apply(&mut self, op: impl FnOnce(&mut Vec<Variable>) -> EngineResult<()>) -> EngineResult<()> {
        let mut working = self.vars.clone();
        op(&mut working)?;
        validate(&self.id, &mut working)?;
        self.vars = working;
        debug!(calculator = %self.id, "state committed");
        Ok(())
    }
}

fn set_input(var: &mut Variable, display: Value) -> EngineResult<()> {
    match &mut var.role {
        Role::Input { editing, .. } => *editing = true,
        Role::Output(_) => return Err(EngineError::invalid_op(&var.id, "outputs are computed and cannot be set")),
    }
    var.set_display(display);
    Ok(())
}

/// Recomputes the outputs downstream of `changed`, or all outputs.
fn recompute(vars: &mut [Variable], changed: Option<usize>) -> EngineResult<()> {
    let graph = DependencyGraph::build(vars)?;
    let scope = changed.map(|pos| graph.downstream_from(&[pos]));
    RecalcEngine::new(&graph).run(vars, scope.as_ref())?;
    Ok(())
}

fn validate(calculator: &str, vars: &mut [Variable]) -> EngineResult<()> {
    if let Some(var) = vars.iter().find(|v| matches!(v.kind, Kind::Numeric { .. }) && v.validators.is_empty()) {
        return Err(EngineError::config(
            format!("{}.{}", calculator, var.id),
            "numeric variable needs at least one validator",
        ));
    }
    let outcomes: Vec<ValidationOutcome> = {
        let view = Vars::new(vars);
        vars.iter().map(|v| evaluate_chain(&v.validators, &view, &v.raw_val)).collect()
    };
    for (var, outcome) in vars.iter_mut().zip(outcomes) {
        var.outcome = outcome;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Direction, VariableDef};
    use crate::units::NumberUnit;
    use crate::validation::{is_greater_than_zero, is_number, Severity};

    fn current_units(def: VariableDef) -> VariableDef {
        def.units([
            NumberUnit::linear("mA", 1e-3),
            NumberUnit::linear("A", 1.0).preferred(),
        ])
        .validator(is_number(Severity::Error))
    }

    fn plain(def: VariableDef) -> VariableDef {
        def.unit(NumberUnit::linear("u", 1.0).preferred()).validator(is_number(Severity::Error))
    }

    /// current (A/mA) feeding power = current * 10 W/A.
    fn power_calc() -> Calculator {
        let def = CalculatorDef::new("power", "Power")
            .variable(current_units(VariableDef::input("current", "Current")).validator(is_greater_than_zero(Severity::Warning)))
            .variable(plain(VariableDef::output("power", "Power", |v| Ok(v.number("current")? * 10.0))));
        Calculator::new(&def).unwrap()
    }

    fn assert_close(value: &Value, expected: f64) {
        let actual = value.as_number().unwrap();
        assert!((actual - expected).abs() <= 1e-12 * expected.abs(), "{} != {}", actual, expected);
    }

    fn json(calc: &Calculator) -> String {
        serde_json::to_string(&calc.snapshot()).unwrap()
    }

    #[test]
    fn test_input_change_recomputes_and_validates() {
        let mut calc = power_calc();
        assert_eq!(calc.variable("power").unwrap().raw_val, Value::Unset);
        assert_eq!(calc.variable("current").unwrap().severity, Severity::Error);

        calc.set_input_value("current", " 2.5 ").unwrap();
        assert_eq!(calc.variable("current").unwrap().raw_val, Value::Number(2.5));
        assert_eq!(calc.variable("power").unwrap().raw_val, Value::Number(25.0));
        assert_eq!(calc.variable("current").unwrap().severity, Severity::Ok);
        assert_eq!(calc.variable("current").unwrap().message, None);
    }

    #[test]
    fn test_unparsable_text_unsets_input_and_output() {
        let mut calc = power_calc();
        calc.set_input_number("current", 1.0).unwrap();
        calc.set_input_value("current", "abc").unwrap();

        let current = calc.variable("current").unwrap();
        assert_eq!(current.raw_val, Value::Unset);
        assert_eq!(current.severity, Severity::Error);
        assert_eq!(current.message.as_deref(), Some("Value must be a number."));
        assert_eq!(calc.variable("power").unwrap().raw_val, Value::Unset);
    }

    #[test]
    fn test_unit_switch_after_edit_changes_display_only() {
        let mut calc = power_calc();
        calc.set_input_value("current", "2.5").unwrap();
        calc.finish_edit("current").unwrap();
        calc.set_unit("current", "mA").unwrap();

        let current = calc.variable("current").unwrap();
        assert_eq!(current.raw_val, Value::Number(2.5));
        assert_eq!(current.disp_val, Value::Number(2500.0));
        assert_eq!(current.selected_unit.as_deref(), Some("mA"));
        assert_eq!(calc.variable("power").unwrap().raw_val, Value::Number(25.0));
    }

    #[test]
    fn test_unit_switch_mid_edit_keeps_display() {
        let mut calc = power_calc();
        calc.set_input_value("current", "2.5").unwrap();
        calc.set_unit("current", "mA").unwrap();

        let current = calc.variable("current").unwrap();
        assert_eq!(current.disp_val, Value::Number(2.5));
        assert_close(&current.raw_val, 0.0025);
        assert_close(&calc.variable("power").unwrap().raw_val, 0.025);

        calc.reset_unit("current").unwrap();
        assert_eq!(calc.variable("current").unwrap().raw_val, Value::Number(2.5));
    }

    #[test]
    fn test_output_units_change_display() {
        let def = CalculatorDef::new("calc", "Calc")
            .variable(plain(VariableDef::input("a", "A").initial_value(2.0)))
            .variable(current_units(VariableDef::output("i", "I", |v| v.number("a"))));
        let mut calc = Calculator::new(&def).unwrap();
        calc.set_unit("i", "mA").unwrap();

        let i = calc.variable("i").unwrap();
        assert_eq!(i.raw_val, Value::Number(2.0));
        assert_close(&i.disp_val, 2000.0);
        assert_eq!(i.disp_text, "2000");
    }

    #[test]
    fn test_setting_an_output_is_rejected() {
        let mut calc = power_calc();
        let before = json(&calc);
        let err = calc.set_input_value("power", "3").unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperation { .. }));
        assert_eq!(json(&calc), before);
        assert!(matches!(calc.finish_edit("power"), Err(EngineError::InvalidOperation { .. })));
    }

    #[test]
    fn test_unknown_unit_leaves_state_unchanged() {
        let mut calc = power_calc();
        calc.set_input_value("current", "1.5").unwrap();
        let before = json(&calc);

        let err = calc.set_unit("current", "kA").unwrap_err();
        assert_eq!(err, EngineError::UnknownUnit { variable: "current".into(), unit: "kA".into() });
        assert_eq!(json(&calc), before);
    }

    #[test]
    fn test_unknown_variable() {
        let mut calc = power_calc();
        assert_eq!(calc.variable("nope").unwrap_err(), EngineError::UnknownVariable("nope".into()));
        assert!(matches!(calc.set_input_value("nope", "1"), Err(EngineError::UnknownVariable(_))));
    }

    #[test]
    fn test_dependency_queries() {
        let calc = power_calc();
        assert_eq!(calc.dependencies("power").unwrap(), vec!["current".to_string()]);
        assert_eq!(calc.dependents("current").unwrap(), vec!["power".to_string()]);
        assert!(calc.dependencies("current").unwrap().is_empty());
    }

    fn choice_calc() -> Calculator {
        let def = CalculatorDef::new("layer", "Layer")
            .variable(VariableDef::choice("layer", "Layer", ["Internal", "External"]).default_choice("External"))
            .variable(plain(VariableDef::output("k", "K", |v| {
                Ok(if v.text("layer")? == "External" { 0.048 } else { 0.024 })
            })));
        Calculator::new(&def).unwrap()
    }

    #[test]
    fn test_choice_accepts_only_options() {
        let mut calc = choice_calc();
        assert_eq!(calc.variable("k").unwrap().raw_val, Value::Number(0.048));

        calc.set_input_value("layer", "Internal").unwrap();
        assert_eq!(calc.variable("k").unwrap().raw_val, Value::Number(0.024));

        let err = calc.set_input_value("layer", "Middle").unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperation { .. }));
        assert_eq!(calc.variable("layer").unwrap().raw_val, Value::Text("Internal".into()));
        assert!(calc.set_input_number("layer", 1.0).is_err());
        assert!(matches!(calc.set_unit("layer", "mm"), Err(EngineError::UnknownUnit { .. })));
    }

    /// v = i * r in one solve group.
    fn ohm_group() -> Calculator {
        let def = CalculatorDef::new("ohm", "Ohm")
            .variable(plain(
                VariableDef::solvable("v", "V", "ohm", |x| Ok(x.number("i")? * x.number("r")?)).initial_value(10.0),
            ))
            .variable(plain(
                VariableDef::solvable("i", "I", "ohm", |x| Ok(x.number("v")? / x.number("r")?)).initial_value(2.0),
            ))
            .variable(plain(
                VariableDef::solvable("r", "R", "ohm", |x| Ok(x.number("v")? / x.number("i")?))
                    .direction(Direction::Output),
            ));
        Calculator::new(&def).unwrap()
    }

    #[test]
    fn test_set_output_flips_group() {
        let mut calc = ohm_group();
        assert_eq!(calc.variable("r").unwrap().raw_val, Value::Number(5.0));

        calc.set_output("v").unwrap();
        assert_eq!(calc.variable("v").unwrap().direction, Direction::Output);
        assert_eq!(calc.variable("r").unwrap().direction, Direction::Input);
        // r keeps its last computed value as an input
        assert_eq!(calc.variable("v").unwrap().raw_val, Value::Number(10.0));

        calc.set_input_number("r", 4.0).unwrap();
        assert_eq!(calc.variable("v").unwrap().raw_val, Value::Number(8.0));
    }

    #[test]
    fn test_set_output_outside_group_rejected() {
        let mut calc = power_calc();
        assert!(matches!(calc.set_output("power"), Err(EngineError::InvalidOperation { .. })));
    }

    #[test]
    fn test_cycle_from_set_output_leaves_state_identical() {
        // b reads c and c reads b; each is paired with a harmless output.
        let def = CalculatorDef::new("cyc", "Cycle")
            .variable(plain(VariableDef::input("a", "A").initial_value(1.0)))
            .variable(plain(VariableDef::solvable("b", "B", "g1", |v| Ok(v.number("c")? + 1.0)).reads_from(["c"])))
            .variable(plain(
                VariableDef::solvable("x", "X", "g1", |v| v.number("a")).reads_from(["a"]).direction(Direction::Output),
            ))
            .variable(plain(VariableDef::solvable("c", "C", "g2", |v| Ok(v.number("b")? + 1.0)).reads_from(["b"])))
            .variable(plain(
                VariableDef::solvable("y", "Y", "g2", |v| v.number("a")).reads_from(["a"]).direction(Direction::Output),
            ));
        let mut calc = Calculator::new(&def).unwrap();
        calc.set_output("b").unwrap();
        let before = json(&calc);

        let err = calc.set_output("c").unwrap_err();
        assert_eq!(err, EngineError::CyclicDependency { cycle: vec!["b".into(), "c".into(), "b".into()] });
        assert_eq!(json(&calc), before);
    }

    #[test]
    fn test_validate_all_is_idempotent() {
        let mut calc = power_calc();
        calc.set_input_number("current", -1.0).unwrap();
        let first = calc.validate_all().unwrap();
        let second = calc.validate_all().unwrap();

        assert_eq!(first, second);
        assert_eq!(first["current"].severity, Severity::Warning);
        assert_eq!(first["current"].message.as_deref(), Some("Value must be greater than zero."));
    }

    #[test]
    fn test_recalc_all_matches_incremental_state() {
        let mut calc = ohm_group();
        calc.set_input_number("i", 4.0).unwrap();
        let incremental = json(&calc);
        calc.recalc_all().unwrap();
        assert_eq!(json(&calc), incremental);
    }
}
