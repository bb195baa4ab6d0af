//! Ready-made calculator definitions.
pub mod low_pass_rc;
pub mod ohms_law;
pub mod track_current_ipc2221a;

use crate::store::CalculatorDef;

/// Every built-in definition, in a stable order.
pub fn definitions() -> Vec<CalculatorDef> {
    vec![
        ohms_law::definition(),
        low_pass_rc::definition(),
        track_current_ipc2221a::definition(),
    ]
}
