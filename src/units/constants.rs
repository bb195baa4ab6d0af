//! Conversion factors shared by the built-in calculators.

pub const METERS_PER_INCH: f64 = 25.4 / 1000.0;
pub const METERS_PER_MIL: f64 = METERS_PER_INCH / 1000.0;
pub const M2_PER_MIL2: f64 = METERS_PER_MIL * METERS_PER_MIL;

/// Copper thickness of one ounce per square foot of PCB copper.
pub const COPPER_THICKNESS_M_PER_OZ: f64 = 0.0000350012;
