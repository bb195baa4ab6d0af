//! PCB track current capability per IPC-2221A.
//!
//! The standard's chart fit works in mils:
//! `A = (I / (k · ΔT^0.44))^(1/0.725)`, with `k = 0.048` for external
//! layers and `0.024` for internal ones. Everything is stored in SI here and
//! converted at the edges.

use crate::error::EquationError;
use crate::store::{CalculatorDef, VariableDef, Vars};
use crate::units::constants::{COPPER_THICKNESS_M_PER_OZ, M2_PER_MIL2, METERS_PER_MIL};
use crate::units::NumberUnit;
use crate::validation::{above, below, is_greater_than_zero, is_number, Severity};

const EXTERNAL_K: f64 = 0.048;
const INTERNAL_K: f64 = 0.024;
const TEMP_RISE_EXPONENT: f64 = 0.44;
const AREA_EXPONENT: f64 = 0.725;

fn checked(def: VariableDef) -> VariableDef {
    def.validator(is_number(Severity::Error)).validator(is_greater_than_zero(Severity::Error))
}

fn layer_coefficient(layer: &str) -> Result<f64, EquationError> {
    match layer {
        "External" => Ok(EXTERNAL_K),
        "Internal" => Ok(INTERNAL_K),
        other => Err(EquationError::Domain(format!("unknown track layer '{}'", other))),
    }
}

/// Cross-sectional area in m².
fn cross_sectional_area(v: &Vars<'_>) -> Result<f64, EquationError> {
    let current = v.number("trackCurrent")?;
    let temp_rise = v.number("tempRise")?;
    let k = layer_coefficient(v.text("trackLayer")?)?;
    let area_mils2 = (current / (k * temp_rise.powf(TEMP_RISE_EXPONENT))).powf(1.0 / AREA_EXPONENT);
    Ok(area_mils2 * M2_PER_MIL2)
}

pub fn definition() -> CalculatorDef {
    CalculatorDef::new("track_current_ipc2221a", "Track Current (IPC-2221A)")
        .description("Minimum PCB track width for a given current and temperature rise, using IPC-2221A.")
        .tag("Electronics")
        .tag("PCB")
        .variable(checked(
            VariableDef::input("trackCurrent", "Track Current")
                .units([
                    NumberUnit::linear("uA", 1e-6),
                    NumberUnit::linear("mA", 1e-3),
                    NumberUnit::linear("A", 1.0).preferred(),
                ])
                .validator(above(
                    35.0,
                    Severity::Warning,
                    "Current is above the maximum (35A) covered by the IPC-2221A charts. Results are extrapolated.",
                ))
                .help("Current the track has to carry."),
        ))
        .variable(checked(
            VariableDef::input("tempRise", "Temperature Rise")
                .unit(NumberUnit::linear("°C", 1.0).preferred())
                .validator(below(
                    10.0,
                    Severity::Warning,
                    "Temperature rise is below the minimum (10°C) covered by the IPC-2221A charts. Results are extrapolated.",
                ))
                .validator(above(
                    100.0,
                    Severity::Warning,
                    "Temperature rise is above the maximum (100°C) covered by the IPC-2221A charts. Results are extrapolated.",
                ))
                .help("Allowed temperature rise of the track above ambient."),
        ))
        .variable(checked(
            VariableDef::input("trackThickness", "Track Thickness")
                .units([
                    NumberUnit::linear("um", 1e-6).preferred(),
                    NumberUnit::linear("mm", 1e-3),
                    NumberUnit::linear("oz", COPPER_THICKNESS_M_PER_OZ),
                ])
                .validator(below(
                    0.5 * COPPER_THICKNESS_M_PER_OZ,
                    Severity::Warning,
                    "Thickness is below the minimum (0.5oz) covered by the IPC-2221A charts. Results are extrapolated.",
                ))
                .validator(above(
                    3.0 * COPPER_THICKNESS_M_PER_OZ,
                    Severity::Warning,
                    "Thickness is above the maximum (3oz) covered by the IPC-2221A charts. Results are extrapolated.",
                ))
                .help("Copper thickness of the track. 1oz copper is about 35um."),
        ))
        .variable(
            VariableDef::choice("trackLayer", "Track Layer", ["Internal", "External"])
                .default_choice("External")
                .help("Internal tracks dissipate heat worse and need to be wider."),
        )
        .variable(checked(
            VariableDef::output("crossSectionalArea", "Cross-sectional Area", cross_sectional_area)
                .reads_from(["trackCurrent", "tempRise", "trackLayer"])
                .units([
                    NumberUnit::linear("mils²", M2_PER_MIL2).preferred(),
                    NumberUnit::linear("um²", 1e-12),
                    NumberUnit::linear("mm²", 1e-6),
                ]),
        ))
        .variable(checked(
            VariableDef::output("minTrackWidth", "Minimum Track Width", |v| {
                Ok(v.number("crossSectionalArea")? / v.number("trackThickness")?)
            })
            .reads_from(["crossSectionalArea", "trackThickness"])
            .units([
                NumberUnit::linear("um", 1e-6),
                NumberUnit::linear("mm", 1e-3).preferred(),
                NumberUnit::linear("mils", METERS_PER_MIL),
            ])
            .help("Narrowest track that stays within the temperature rise."),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::Calculator;
    use crate::store::Value;

    fn expected_width_m(current: f64, temp_rise: f64, k: f64, thickness_m: f64) -> f64 {
        let area_mils2 = (current / (k * temp_rise.powf(0.44))).powf(1.0 / 0.725);
        area_mils2 * M2_PER_MIL2 / thickness_m
    }

    fn close(actual: &Value, expected: f64) -> bool {
        let actual = actual.as_number().unwrap();
        (actual - expected).abs() <= 1e-9 * expected.abs()
    }

    #[test]
    fn test_outputs_unset_until_inputs_given() {
        let calc = Calculator::new(&definition()).unwrap();
        let width = calc.variable("minTrackWidth").unwrap();
        assert_eq!(width.raw_val, Value::Unset);
        assert_eq!(width.disp_val, Value::Unset);
        assert_eq!(width.disp_text, "");
        assert_eq!(calc.variable("trackLayer").unwrap().raw_val, Value::Text("External".into()));
    }

    #[test]
    fn test_layer_coefficient() {
        assert_eq!(layer_coefficient("External"), Ok(0.048));
        assert_eq!(layer_coefficient("Internal"), Ok(0.024));
        assert!(layer_coefficient("Core").is_err());
    }

    #[test]
    fn test_width_depends_on_layer() {
        let mut calc = Calculator::new(&definition()).unwrap();
        calc.set_input_value("trackCurrent", "2.5").unwrap();
        calc.set_input_value("tempRise", "10").unwrap();
        calc.set_input_value("trackThickness", "35").unwrap();

        let external = calc.variable("minTrackWidth").unwrap();
        assert!(close(&external.raw_val, expected_width_m(2.5, 10.0, 0.048, 35e-6)));
        assert_eq!(external.severity, Severity::Ok);

        calc.set_input_value("trackLayer", "Internal").unwrap();
        let internal = calc.variable("minTrackWidth").unwrap();
        assert!(close(&internal.raw_val, expected_width_m(2.5, 10.0, 0.024, 35e-6)));
    }
}
