//! The live state of a calculator variable, plus the read-only view that
//! equations and validators are handed.

use super::types::{format_engineering, format_significant, Direction, Value};
use crate::error::{EngineError, EngineResult, EquationError};
use crate::units::{self, NumberUnit, Units};
use crate::validation::{ValidationOutcome, Validator};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub type EquationFn = Arc<dyn Fn(&Vars<'_>) -> Result<f64, EquationError> + Send + Sync>;

/// How an output derives its raw value.
#[derive(Clone)]
pub struct Formula {
    pub(crate) equation: EquationFn,
    /// Explicit dependency set. `None` means "every current input".
    pub(crate) reads_from: Option<BTreeSet<String>>,
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formula").field("reads_from", &self.reads_from).finish_non_exhaustive()
    }
}

impl Formula {
    pub fn evaluate(&self, vars: &Vars<'_>) -> Result<f64, EquationError> {
        (self.equation)(vars)
    }
}

/// Direction as a tagged variant. Inputs of a solve group keep their
/// formula dormant until `set_output` promotes them.
#[derive(Debug, Clone)]
pub enum Role {
    Input { editing: bool, dormant: Option<Formula> },
    Output(Formula),
}

#[derive(Debug, Clone)]
pub enum Kind {
    Numeric { units: Units, selected: usize, significant_figures: usize, engineering: bool },
    Choice { options: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) help: Option<String>,
    pub(crate) kind: Kind,
    pub(crate) role: Role,
    pub(crate) group: Option<String>,
    pub(crate) raw_val: Value,
    pub(crate) disp_val: Value,
    pub(crate) validators: Vec<Validator>,
    pub(crate) outcome: ValidationOutcome,
}

impl Variable {
    pub fn id(&self) -> &str { &self.id }
    pub fn raw(&self) -> &Value { &self.raw_val }

    pub fn direction(&self) -> Direction {
        match self.role {
            Role::Input { .. } => Direction::Input,
            Role::Output(_) => Direction::Output,
        }
    }

    pub fn is_output(&self) -> bool {
        matches!(self.role, Role::Output(_))
    }

    pub fn formula(&self) -> Option<&Formula> {
        match &self.role {
            Role::Output(formula) => Some(formula),
            Role::Input { .. } => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.role, Role::Input { editing: true, .. })
    }

    pub fn selected_unit(&self) -> Option<&NumberUnit> {
        match &self.kind {
            Kind::Numeric { units, selected, .. } => units.get(*selected),
            Kind::Choice { .. } => None,
        }
    }

    fn unit_position(&self, label: &str) -> EngineResult<usize> {
        let unknown = || EngineError::UnknownUnit { variable: self.id.clone(), unit: label.to_string() };
        match &self.kind {
            Kind::Numeric { units, .. } => units.position(label).ok_or_else(unknown),
            Kind::Choice { .. } => Err(unknown()),
        }
    }

    /// Converts a display value into this variable's base unit using `label`.
    pub fn to_raw(&self, display: &Value, label: &str) -> EngineResult<Value> {
        let idx = self.unit_position(label)?;
        Ok(self.convert_with(idx, display, units::to_raw))
    }

    /// Converts a raw value into the unit named `label`.
    pub fn to_display(&self, raw: &Value, label: &str) -> EngineResult<Value> {
        let idx = self.unit_position(label)?;
        Ok(self.convert_with(idx, raw, units::to_display))
    }

    fn convert_with(&self, idx: usize, value: &Value, f: fn(&Value, &NumberUnit) -> Value) -> Value {
        match &self.kind {
            Kind::Numeric { units, .. } => units.get(idx).map_or(Value::Unset, |u| f(value, u)),
            Kind::Choice { .. } => value.clone(),
        }
    }

    /// Stores a display value and re-derives the raw value from it.
    pub(crate) fn set_display(&mut self, display: Value) {
        self.raw_val = match self.selected_unit() {
            Some(unit) => units::to_raw(&display, unit),
            None => display.clone(),
        };
        self.disp_val = display;
    }

    /// Stores a raw value and re-derives the display value from it.
    pub(crate) fn set_raw(&mut self, raw: Value) {
        self.disp_val = match self.selected_unit() {
            Some(unit) => units::to_display(&raw, unit),
            None => raw.clone(),
        };
        self.raw_val = raw;
    }

    pub(crate) fn select_unit(&mut self, label: &str) -> EngineResult<()> {
        let idx = self.unit_position(label)?;
        if let Kind::Numeric { selected, .. } = &mut self.kind {
            *selected = idx;
        }
        Ok(())
    }

    pub(crate) fn default_unit_label(&self) -> Option<String> {
        match &self.kind {
            Kind::Numeric { units, .. } => {
                units.default_position().ok().and_then(|i| units.get(i)).map(|u| u.label().to_string())
            }
            Kind::Choice { .. } => None,
        }
    }

    pub fn disp_text(&self) -> String {
        match (&self.disp_val, &self.kind) {
            (Value::Unset, _) => String::new(),
            (Value::Number(v), Kind::Numeric { significant_figures, engineering: true, .. }) => {
                format_engineering(*v, *significant_figures)
            }
            (Value::Number(v), Kind::Numeric { significant_figures, .. }) => format_significant(*v, *significant_figures),
            (Value::Number(v), Kind::Choice { .. }) => v.to_string(),
            (Value::Text(s), _) => s.clone(),
        }
    }

    pub fn snapshot(&self) -> VariableSnapshot {
        VariableSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            direction: self.direction(),
            raw_val: self.raw_val.clone(),
            disp_val: self.disp_val.clone(),
            disp_text: self.disp_text(),
            selected_unit: self.selected_unit().map(|u| u.label().to_string()),
            severity: self.outcome.severity,
            message: self.outcome.message.clone(),
            help: self.help.clone(),
        }
    }
}

/// Read-only copy of a variable's externally visible state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSnapshot {
    pub id: String,
    pub name: String,
    pub direction: Direction,
    pub raw_val: Value,
    pub disp_val: Value,
    /// `disp_val` rounded for presentation; empty when unset.
    pub disp_text: String,
    pub selected_unit: Option<String>,
    pub severity: crate::validation::Severity,
    pub message: Option<String>,
    pub help: Option<String>,
}

/// Read view over a calculator's variables.
///
/// When built for an equation the view is restricted to that output's
/// dependency set, so reading anything else fails with `Undeclared`.
#[derive(Debug, Clone, Copy)]
pub struct Vars<'a> {
    vars: &'a [Variable],
    allowed: Option<&'a [usize]>,
}

impl<'a> Vars<'a> {
    pub fn new(vars: &'a [Variable]) -> Self {
        Self { vars, allowed: None }
    }

    pub(crate) fn restricted(vars: &'a [Variable], allowed: &'a [usize]) -> Self {
        Self { vars, allowed: Some(allowed) }
    }

    pub fn empty() -> Self {
        Self { vars: &[], allowed: None }
    }

    pub fn value(&self, id: &str) -> Result<&'a Value, EquationError> {
        let pos = self.vars.iter().position(|v| v.id == id)
            .ok_or_else(|| EquationError::UnknownVariable { variable: id.to_string() })?;
        if let Some(allowed) = self.allowed {
            if !allowed.contains(&pos) {
                return Err(EquationError::Undeclared { variable: id.to_string() });
            }
        }
        Ok(&self.vars[pos].raw_val)
    }

    pub fn number(&self, id: &str) -> Result<f64, EquationError> {
        match self.value(id)? {
            Value::Number(v) => Ok(*v),
            Value::Unset => Err(EquationError::Unset { variable: id.to_string() }),
            Value::Text(_) => Err(EquationError::NotANumber { variable: id.to_string() }),
        }
    }

    pub fn text(&self, id: &str) -> Result<&'a str, EquationError> {
        match self.value(id)? {
            Value::Text(s) => Ok(s.as_str()),
            Value::Unset => Err(EquationError::Unset { variable: id.to_string() }),
            Value::Number(_) => Err(EquationError::NotText { variable: id.to_string() }),
        }
    }
}
