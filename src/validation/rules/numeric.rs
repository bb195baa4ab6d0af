//! Validation rules every numeric variable is expected to carry.

use crate::store::Value;
use crate::validation::{Severity, Validator};

/// Fires when the value is unset or not numeric (e.g. the field was cleared
/// or holds unparsable text).
pub fn is_number(level: Severity) -> Validator {
    Validator::new("Value must be a number.", move |_, own| match own {
        Value::Number(_) => Severity::Ok,
        _ => level,
    })
}

/// Fires for numbers that are zero or negative. Unset values are left to
/// `is_number`.
pub fn is_greater_than_zero(level: Severity) -> Validator {
    Validator::new("Value must be greater than zero.", move |_, own| match own {
        Value::Number(v) if *v <= 0.0 => level,
        _ => Severity::Ok,
    })
}
