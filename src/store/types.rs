use serde::{Deserialize, Serialize};

/// The atomic unit of data held by a calculator variable.
///
/// `Unset` is distinct from zero and from NaN: it means "no valid value", and
/// is what unparsable input and failed equations produce.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Unset,
    Number(f64),
    Text(String),
}

impl Value {
    /// Parses user-entered text as a number. Empty, unparsable or non-finite
    /// text yields `Unset`.
    pub fn parse_number(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(v) => Self::from_number(v),
            Err(_) => Value::Unset,
        }
    }

    /// Wraps a number, mapping NaN and infinities to `Unset`.
    pub fn from_number(v: f64) -> Self {
        if v.is_finite() { Value::Number(v) } else { Value::Unset }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self { Value::Number(v) => Some(*v), _ => None }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self { Value::Text(s) => Some(s), _ => None }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

/// Decimal exponents outside this range are rendered in `e` notation.
const PLAIN_EXPONENTS: std::ops::RangeInclusive<i32> = -9..=15;

const SI_PREFIXES: [&str; 17] = ["y", "z", "a", "f", "p", "n", "u", "m", "", "k", "M", "G", "T", "P", "E", "Z", "Y"];

/// Rounds to `digits` significant figures, returning the scientific mantissa
/// and decimal exponent. Works across the whole `f64` range, subnormals included.
fn round_significant(value: f64, digits: usize) -> (f64, i32) {
    let sci = format!("{:.*e}", digits - 1, value);
    match sci.split_once('e') {
        Some((mantissa, exponent)) => (mantissa.parse().unwrap_or(value), exponent.parse().unwrap_or(0)),
        None => (value, 0),
    }
}

fn trim_zeros(text: String) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Renders `mantissa * 10^shift` keeping `digits` significant figures.
fn mantissa_text(mantissa: f64, shift: i32, digits: usize) -> String {
    let places = (digits as i32 - 1 - shift).max(0) as usize;
    trim_zeros(format!("{:.*}", places, mantissa * 10f64.powi(shift)))
}

/// Renders a number rounded to `digits` significant figures, without
/// trailing zeros.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() || digits == 0 {
        return value.to_string();
    }
    let (mantissa, exponent) = round_significant(value, digits);
    if PLAIN_EXPONENTS.contains(&exponent) {
        mantissa_text(mantissa, exponent, digits)
    } else {
        format!("{}e{}", mantissa_text(mantissa, 0, digits), exponent)
    }
}

/// Like [`format_significant`], but with the exponent moved to a multiple of
/// three and written as an SI prefix (`1.592k`, `47n`).
pub fn format_engineering(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() || digits == 0 {
        return value.to_string();
    }
    let (mantissa, exponent) = round_significant(value, digits);
    let shown = exponent.div_euclid(3) * 3;
    let mantissa = mantissa_text(mantissa, exponent - shown, digits);
    match usize::try_from(shown / 3 + 8).ok().and_then(|i| SI_PREFIXES.get(i)) {
        Some(prefix) => format!("{}{}", mantissa, prefix),
        None => format!("{}e{}", mantissa, shown),
    }
}
