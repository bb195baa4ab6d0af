//! First-order RC low-pass filter, `fc = 1 / (2πRC)`.
use crate::store::{CalculatorDef, Direction, VariableDef};
use crate::units::NumberUnit;
use crate::validation::{is_greater_than_zero, is_number, Severity};
use std::f64::consts::PI;

const GROUP: &str = "rcf";

fn checked(def: VariableDef) -> VariableDef {
    def.validator(is_number(Severity::Error))
        .validator(is_greater_than_zero(Severity::Error))
        .engineering_notation(true)
}

pub fn definition() -> CalculatorDef {
    CalculatorDef::new("low_pass_rc", "Low-Pass RC Filter")
        .description("Cut-off frequency of a first-order RC filter, or the R or C needed for one.")
        .tag("Electronics")
        .tag("Filters")
        .variable(checked(
            VariableDef::solvable("resistance", "Resistance", GROUP, |v| {
                Ok(1.0 / (2.0 * PI * v.number("cutoffFrequency")? * v.number("capacitance")?))
            })
            .reads_from(["cutoffFrequency", "capacitance"])
            .units([
                NumberUnit::linear("Ω", 1.0),
                NumberUnit::linear("kΩ", 1e3).preferred(),
                NumberUnit::linear("MΩ", 1e6),
            ]),
        ))
        .variable(checked(
            VariableDef::solvable("capacitance", "Capacitance", GROUP, |v| {
                Ok(1.0 / (2.0 * PI * v.number("cutoffFrequency")? * v.number("resistance")?))
            })
            .reads_from(["cutoffFrequency", "resistance"])
            .units([
                NumberUnit::linear("pF", 1e-12),
                NumberUnit::linear("nF", 1e-9).preferred(),
                NumberUnit::linear("uF", 1e-6),
                NumberUnit::linear("mF", 1e-3),
            ]),
        ))
        .variable(checked(
            VariableDef::solvable("cutoffFrequency", "Cut-off Frequency", GROUP, |v| {
                Ok(1.0 / (2.0 * PI * v.number("resistance")? * v.number("capacitance")?))
            })
            .reads_from(["resistance", "capacitance"])
            .direction(Direction::Output)
            .units([
                NumberUnit::linear("Hz", 1.0),
                NumberUnit::linear("kHz", 1e3).preferred(),
                NumberUnit::linear("MHz", 1e6),
            ])
            .help("Frequency at which the output is 3dB below the input."),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::Calculator;

    #[test]
    fn test_cutoff_frequency() {
        let mut calc = Calculator::new(&definition()).unwrap();
        calc.set_input_value("resistance", "1").unwrap();
        calc.set_input_value("capacitance", "100").unwrap();

        let fc = calc.variable("cutoffFrequency").unwrap();
        let expected = 1.0 / (2.0 * PI * 1e3 * 100e-9);
        assert!((fc.raw_val.as_number().unwrap() - expected).abs() < 1e-6);
        assert_eq!(fc.disp_text, "1.592");

        calc.set_unit("cutoffFrequency", "Hz").unwrap();
        assert_eq!(calc.variable("cutoffFrequency").unwrap().disp_text, "1.592k");
    }

    #[test]
    fn test_solve_for_capacitance_inverts_cutoff() {
        let mut calc = Calculator::new(&definition()).unwrap();
        calc.set_output("capacitance").unwrap();
        calc.set_input_number("resistance", 10.0).unwrap();
        calc.set_input_number("cutoffFrequency", 1.0).unwrap();

        let c = calc.variable("capacitance").unwrap().raw_val.as_number().unwrap();
        let expected = 1.0 / (2.0 * PI * 1e3 * 1e4);
        assert!((c - expected).abs() <= 1e-12 * expected);
    }
}
