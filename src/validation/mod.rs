//! Per-variable validation: severities, validator chains and the stock rules.
pub mod validator;
pub mod rules {
    pub mod numeric;
    pub mod range;
}

pub use validator::{evaluate_chain, Severity, ValidationOutcome, Validator};
pub use rules::numeric::{is_greater_than_zero, is_number};
pub use rules::range::{above, below};
