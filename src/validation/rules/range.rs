//! Range rules, typically used to warn when an input leaves the region a
//! chart or standard was fitted over (extrapolation).

use crate::store::Value;
use crate::validation::{Severity, Validator};

/// Fires when the raw value is strictly below `limit`.
pub fn below(limit: f64, level: Severity, message: impl Into<String>) -> Validator {
    Validator::new(message, move |_, own| match own {
        Value::Number(v) if *v < limit => level,
        _ => Severity::Ok,
    })
}

/// Fires when the raw value is strictly above `limit`.
pub fn above(limit: f64, level: Severity, message: impl Into<String>) -> Validator {
    Validator::new(message, move |_, own| match own {
        Value::Number(v) if *v > limit => level,
        _ => Severity::Ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Vars;

    #[test]
    fn test_limits_are_exclusive() {
        let low = below(274e-3, Severity::Warning, "too low");
        let high = above(26.0, Severity::Warning, "too high");
        let vars = Vars::empty();

        assert_eq!(low.check(&vars, &Value::Number(0.1)), Severity::Warning);
        assert_eq!(low.check(&vars, &Value::Number(274e-3)), Severity::Ok);
        assert_eq!(high.check(&vars, &Value::Number(26.0)), Severity::Ok);
        assert_eq!(high.check(&vars, &Value::Number(30.0)), Severity::Warning);
        assert_eq!(high.check(&vars, &Value::Unset), Severity::Ok);
    }
}
