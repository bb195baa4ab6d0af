//! Ohm's law: `V = I·R`, solvable for any one of the three.
use crate::store::{CalculatorDef, Direction, VariableDef};
use crate::units::NumberUnit;
use crate::validation::{is_greater_than_zero, is_number, Severity};

const GROUP: &str = "vir";

fn checked(def: VariableDef) -> VariableDef {
    def.validator(is_number(Severity::Error)).validator(is_greater_than_zero(Severity::Error))
}

pub fn definition() -> CalculatorDef {
    CalculatorDef::new("ohms_law", "Ohm's Law")
        .description("Calculate voltage, current or resistance from the other two.")
        .tag("Electronics")
        .tag("Basic")
        .variable(checked(
            VariableDef::solvable("voltage", "Voltage", GROUP, |v| Ok(v.number("current")? * v.number("resistance")?))
                .reads_from(["current", "resistance"])
                .units([
                    NumberUnit::linear("mV", 1e-3),
                    NumberUnit::linear("V", 1.0).preferred(),
                    NumberUnit::linear("kV", 1e3),
                ])
                .help("Voltage across the resistor."),
        ))
        .variable(checked(
            VariableDef::solvable("current", "Current", GROUP, |v| Ok(v.number("voltage")? / v.number("resistance")?))
                .reads_from(["voltage", "resistance"])
                .units([
                    NumberUnit::linear("pA", 1e-12),
                    NumberUnit::linear("nA", 1e-9),
                    NumberUnit::linear("uA", 1e-6),
                    NumberUnit::linear("mA", 1e-3),
                    NumberUnit::linear("A", 1.0).preferred(),
                ])
                .help("Current through the resistor."),
        ))
        .variable(checked(
            VariableDef::solvable("resistance", "Resistance", GROUP, |v| Ok(v.number("voltage")? / v.number("current")?))
                .reads_from(["voltage", "current"])
                .direction(Direction::Output)
                .units([
                    NumberUnit::linear("mΩ", 1e-3),
                    NumberUnit::linear("Ω", 1.0).preferred(),
                    NumberUnit::linear("kΩ", 1e3),
                    NumberUnit::linear("MΩ", 1e6),
                    NumberUnit::linear("GΩ", 1e9),
                ])
                .help("Resistance of the resistor or other component."),
        ))
}
