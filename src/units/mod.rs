//! Bidirectional conversion between display values (the user's chosen unit)
//! and raw values (the variable's fixed base unit, usually SI).

pub mod constants;

use crate::store::Value;
use std::fmt;
use std::sync::Arc;

pub type ConversionFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// How a unit maps onto the base unit.
#[derive(Clone)]
pub enum Conversion {
    /// `raw = display * factor`.
    Linear(f64),
    /// Arbitrary monotonic pair, e.g. logarithmic scales.
    Function { to_base: ConversionFn, from_base: ConversionFn },
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversion::Linear(factor) => write!(f, "Linear({})", factor),
            Conversion::Function { .. } => write!(f, "Function(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NumberUnit {
    label: String,
    conversion: Conversion,
    is_default: bool,
}

impl NumberUnit {
    pub fn linear(label: impl Into<String>, factor: f64) -> Self {
        Self { label: label.into(), conversion: Conversion::Linear(factor), is_default: false }
    }

    pub fn with_functions(
        label: impl Into<String>,
        to_base: impl Fn(f64) -> f64 + Send + Sync + 'static,
        from_base: impl Fn(f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            conversion: Conversion::Function { to_base: Arc::new(to_base), from_base: Arc::new(from_base) },
            is_default: false,
        }
    }

    /// Marks this unit as the one selected at creation and on reset.
    pub fn preferred(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn label(&self) -> &str { &self.label }

    /// Linear factors must be finite and non-zero for display and raw values
    /// to convert back and forth. Function pairs are taken on trust.
    pub fn is_invertible(&self) -> bool {
        match self.conversion {
            Conversion::Linear(factor) => factor.is_finite() && factor != 0.0,
            Conversion::Function { .. } => true,
        }
    }

    pub fn is_default(&self) -> bool { self.is_default }

    pub fn to_base(&self, display: f64) -> f64 {
        match &self.conversion {
            Conversion::Linear(factor) => display * factor,
            Conversion::Function { to_base, .. } => to_base(display),
        }
    }

    pub fn from_base(&self, raw: f64) -> f64 {
        match &self.conversion {
            Conversion::Linear(factor) => raw / factor,
            Conversion::Function { from_base, .. } => from_base(raw),
        }
    }
}

/// Converts a display value into a raw value. `Unset` and text pass through.
pub fn to_raw(display: &Value, unit: &NumberUnit) -> Value {
    match display {
        Value::Number(v) => Value::from_number(unit.to_base(*v)),
        other => other.clone(),
    }
}

/// Converts a raw value into the given unit for display.
pub fn to_display(raw: &Value, unit: &NumberUnit) -> Value {
    match raw {
        Value::Number(v) => Value::from_number(unit.from_base(*v)),
        other => other.clone(),
    }
}

/// The ordered unit list of a single numeric variable.
#[derive(Debug, Clone, Default)]
pub struct Units {
    units: Vec<NumberUnit>,
}

impl Units {
    pub fn new(units: Vec<NumberUnit>) -> Self { Self { units } }

    pub fn len(&self) -> usize { self.units.len() }
    pub fn is_empty(&self) -> bool { self.units.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &NumberUnit> { self.units.iter() }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.units.iter().position(|u| u.label == label)
    }

    pub fn get(&self, idx: usize) -> Option<&NumberUnit> { self.units.get(idx) }

    /// Position of the unit marked as default. `Err(n)` carries the number of
    /// units marked when it is not exactly one.
    pub fn default_position(&self) -> Result<usize, usize> {
        let marked: Vec<usize> = self.units.iter().enumerate()
            .filter(|(_, u)| u.is_default)
            .map(|(i, _)| i)
            .collect();
        match marked.as_slice() {
            [only] => Ok(*only),
            _ => Err(marked.len()),
        }
    }

    /// Forces `idx` to be the only default unit.
    pub(crate) fn set_default(&mut self, idx: usize) {
        for (i, unit) in self.units.iter_mut().enumerate() {
            unit.is_default = i == idx;
        }
    }
}
