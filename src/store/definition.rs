//! Static calculator definitions and their validation into live variables.

use super::types::{Direction, Value};
use super::variable::{EquationFn, Formula, Kind, Role, Variable, Vars};
use crate::error::{EngineError, EngineResult, EquationError};
use crate::units::{NumberUnit, Units};
use crate::validation::{ValidationOutcome, Validator};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

const DEFAULT_SIGNIFICANT_FIGURES: usize = 4;

#[derive(Debug, Clone)]
enum DefKind {
    Numeric { units: Vec<NumberUnit>, default_unit: Option<String>, significant_figures: usize, engineering: bool },
    Choice { options: Vec<String>, default: Option<String> },
}

/// Definition of one variable, consumed by [`CalculatorDef`].
#[derive(Clone)]
pub struct VariableDef {
    id: String,
    name: String,
    help: Option<String>,
    direction: Direction,
    kind: DefKind,
    equation: Option<EquationFn>,
    reads_from: Option<BTreeSet<String>>,
    validators: Vec<Validator>,
    group: Option<String>,
    initial: Option<f64>,
}

impl std::fmt::Debug for VariableDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableDef")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

impl VariableDef {
    fn base(id: impl Into<String>, name: impl Into<String>, direction: Direction, kind: DefKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            help: None,
            direction,
            kind,
            equation: None,
            reads_from: None,
            validators: Vec::new(),
            group: None,
            initial: None,
        }
    }

    fn numeric_kind() -> DefKind {
        DefKind::Numeric {
            units: Vec::new(),
            default_unit: None,
            significant_figures: DEFAULT_SIGNIFICANT_FIGURES,
            engineering: false,
        }
    }

    /// A numeric input.
    pub fn input(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::base(id, name, Direction::Input, Self::numeric_kind())
    }

    /// A numeric output computed by `equation`.
    pub fn output(
        id: impl Into<String>,
        name: impl Into<String>,
        equation: impl Fn(&Vars<'_>) -> Result<f64, EquationError> + Send + Sync + 'static,
    ) -> Self {
        Self::base(id, name, Direction::Output, Self::numeric_kind()).equation(equation)
    }

    /// A member of a "solve for" group. Starts as an input unless
    /// `.direction(Direction::Output)` is called.
    pub fn solvable(
        id: impl Into<String>,
        name: impl Into<String>,
        group: impl Into<String>,
        equation: impl Fn(&Vars<'_>) -> Result<f64, EquationError> + Send + Sync + 'static,
    ) -> Self {
        let mut def = Self::base(id, name, Direction::Input, Self::numeric_kind()).equation(equation);
        def.group = Some(group.into());
        def
    }

    /// An input that holds one of a fixed set of text options.
    pub fn choice<S: Into<String>>(id: impl Into<String>, name: impl Into<String>, options: impl IntoIterator<Item = S>) -> Self {
        let options = options.into_iter().map(Into::into).collect();
        Self::base(id, name, Direction::Input, DefKind::Choice { options, default: None })
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn equation(mut self, equation: impl Fn(&Vars<'_>) -> Result<f64, EquationError> + Send + Sync + 'static) -> Self {
        self.equation = Some(Arc::new(equation));
        self
    }

    pub fn reads_from<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.reads_from = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn unit(mut self, unit: NumberUnit) -> Self {
        if let DefKind::Numeric { units, .. } = &mut self.kind {
            units.push(unit);
        }
        self
    }

    pub fn units(self, units: impl IntoIterator<Item = NumberUnit>) -> Self {
        units.into_iter().fold(self, Self::unit)
    }

    pub fn default_unit(mut self, label: impl Into<String>) -> Self {
        if let DefKind::Numeric { default_unit, .. } = &mut self.kind {
            *default_unit = Some(label.into());
        }
        self
    }

    pub fn significant_figures(mut self, digits: usize) -> Self {
        if let DefKind::Numeric { significant_figures, .. } = &mut self.kind {
            *significant_figures = digits;
        }
        self
    }

    /// Display text uses SI prefixes (`1.592k`) instead of plain decimals.
    pub fn engineering_notation(mut self, enabled: bool) -> Self {
        if let DefKind::Numeric { engineering, .. } = &mut self.kind {
            *engineering = enabled;
        }
        self
    }

    pub fn default_choice(mut self, option: impl Into<String>) -> Self {
        if let DefKind::Choice { default, .. } = &mut self.kind {
            *default = Some(option.into());
        }
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Initial display value, expressed in the default unit.
    pub fn initial_value(mut self, display: f64) -> Self {
        self.initial = Some(display);
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    fn into_variable(self, scope: &str) -> EngineResult<Variable> {
        let err = |reason: String| EngineError::config(scope, reason);

        let mut initial_choice = None;
        let kind = match self.kind {
            DefKind::Numeric { units, default_unit, significant_figures, engineering } => {
                if units.is_empty() {
                    return Err(err("numeric variable has no units".into()));
                }
                if let Some(bad) = units.iter().find(|u| !u.is_invertible()) {
                    return Err(err(format!("unit '{}' has a zero or non-finite factor", bad.label())));
                }
                if self.validators.is_empty() {
                    return Err(err("numeric variable needs at least one validator".into()));
                }
                let mut units = Units::new(units);
                let selected = match default_unit {
                    Some(label) => {
                        let idx = units.position(&label)
                            .ok_or_else(|| err(format!("default unit '{}' is not among the variable's units", label)))?;
                        match units.default_position() {
                            Ok(marked) if marked != idx => {
                                return Err(err(format!("default unit '{}' conflicts with a unit marked preferred", label)));
                            }
                            Err(marked) if marked > 1 => {
                                return Err(err(format!("expected exactly one default unit, found {}", marked)));
                            }
                            _ => {}
                        }
                        units.set_default(idx);
                        idx
                    }
                    None => units.default_position().map_err(|marked| {
                        err(format!("expected exactly one default unit, found {}", marked))
                    })?,
                };
                Kind::Numeric { units, selected, significant_figures, engineering }
            }
            DefKind::Choice { options, default } => {
                if options.is_empty() {
                    return Err(err("choice variable has no options".into()));
                }
                if self.direction == Direction::Output || self.equation.is_some() || self.group.is_some() {
                    return Err(err("choice variables can only be plain inputs".into()));
                }
                if let Some(d) = &default {
                    if !options.contains(d) {
                        return Err(err(format!("default option '{}' is not among the options", d)));
                    }
                }
                initial_choice = default.or_else(|| options.first().cloned());
                Kind::Choice { options }
            }
        };

        if self.reads_from.is_some() && self.equation.is_none() {
            return Err(err("reads_from given without an equation".into()));
        }
        let formula = self.equation.map(|equation| Formula { equation, reads_from: self.reads_from });

        let role = match (self.direction, formula, &self.group) {
            (Direction::Output, Some(formula), _) => Role::Output(formula),
            (Direction::Output, None, _) => return Err(err("output variable has no equation".into())),
            (Direction::Input, Some(formula), Some(_)) => Role::Input { editing: false, dormant: Some(formula) },
            (Direction::Input, Some(_), None) => return Err(err("input variable must not have an equation".into())),
            (Direction::Input, None, Some(_)) => return Err(err("solve group members need an equation".into())),
            (Direction::Input, None, None) => Role::Input { editing: false, dormant: None },
        };

        if self.initial.is_some() && matches!(role, Role::Output(_)) {
            return Err(err("outputs cannot be given an initial value".into()));
        }

        let mut var = Variable {
            id: self.id,
            name: self.name,
            help: self.help,
            kind,
            role,
            group: self.group,
            raw_val: Value::Unset,
            disp_val: Value::Unset,
            validators: self.validators,
            outcome: ValidationOutcome::default(),
        };

        if let Some(choice) = initial_choice {
            var.set_display(Value::Text(choice));
        } else if let Some(initial) = self.initial {
            var.set_display(Value::from_number(initial));
        }
        Ok(var)
    }
}

/// Static description of a calculator, validated by `Calculator::new`.
#[derive(Debug, Clone, Default)]
pub struct CalculatorDef {
    pub(crate) id: String,
    pub(crate) display_name: String,
    pub(crate) description: String,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) vars: Vec<VariableDef>,
}

impl CalculatorDef {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: display_name.into(), ..Default::default() }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn variable(mut self, def: VariableDef) -> Self {
        self.vars.push(def);
        self
    }

    /// Validates every definition and produces the live variables in
    /// declaration order.
    pub(crate) fn build_variables(&self) -> EngineResult<Vec<Variable>> {
        let mut seen = HashSet::new();
        let mut vars = Vec::with_capacity(self.vars.len());

        for def in &self.vars {
            if !seen.insert(def.id.clone()) {
                return Err(EngineError::config(&self.id, format!("duplicate variable id '{}'", def.id)));
            }
            let scope = format!("{}.{}", self.id, def.id);
            vars.push(def.clone().into_variable(&scope)?);
        }

        for var in &vars {
            let reads = match &var.role {
                Role::Output(f) | Role::Input { dormant: Some(f), .. } => f.reads_from.as_ref(),
                Role::Input { dormant: None, .. } => None,
            };
            if let Some(unknown) = reads.into_iter().flatten().find(|id| !seen.contains(*id)) {
                return Err(EngineError::config(
                    format!("{}.{}", self.id, var.id),
                    format!("reads_from names unknown variable '{}'", unknown),
                ));
            }
        }

        let mut outputs_per_group: BTreeMap<&str, usize> = BTreeMap::new();
        for var in &vars {
            if let Some(group) = &var.group {
                *outputs_per_group.entry(group.as_str()).or_insert(0) += var.is_output() as usize;
            }
        }
        if let Some((group, count)) = outputs_per_group.iter().find(|(_, count)| **count != 1) {
            return Err(EngineError::config(
                &self.id,
                format!("group '{}' must have exactly one output, found {}", group, count),
            ));
        }

        Ok(vars)
    }
}
