// Firmware default calibration of the reference board.
//
// ADC values are left aligned to 16 bits, full scale 65535 at 3.3 V.
//   Vout, VreversePolarity, Vin  - 1:10 divider, 33 V full scale
//   Vb0Pin..Vb6Pin               - 1:2 divider, 6.6 V full scale
//   Ismps                        - 50 mOhm shunt, x10 amplifier
//   Idischarge                   - 100 mOhm shunt, x10 amplifier
//   Tintern, Textern             - linearised NTC, 0.01 degC

// Licensed under the Apache License, Version 2.0

use super::{CalibrationPoint, PointPair};
use crate::channel::PHYSICAL_INPUTS;

const fn pair(x0: u16, y0: u16, x1: u16, y1: u16) -> PointPair {
    [CalibrationPoint::new(x0, y0), CalibrationPoint::new(x1, y1)]
}

const HIGH_VOLTAGE: PointPair = pair(0, 0, 60_000, 30_212);
const BALANCER_TAP: PointPair = pair(0, 0, 40_000, 4028);

/// Default anchors, indexed like `Name::physical()`.
pub const DEFAULT_POINTS: [PointPair; PHYSICAL_INPUTS] = [
    HIGH_VOLTAGE,                    // Vout
    HIGH_VOLTAGE,                    // VreversePolarity
    pair(330, 0, 32_768, 3300),      // Ismps
    pair(330, 0, 32_768, 1650),      // Idischarge
    HIGH_VOLTAGE,                    // Vin
    pair(20_000, 2000, 35_000, 6000), // Tintern
    pair(20_000, 2000, 35_000, 6000), // Textern
    BALANCER_TAP,                    // Vb0Pin
    BALANCER_TAP,                    // Vb1Pin
    BALANCER_TAP,                    // Vb2Pin
    BALANCER_TAP,                    // Vb3Pin
    BALANCER_TAP,                    // Vb4Pin
    BALANCER_TAP,                    // Vb5Pin
    BALANCER_TAP,                    // Vb6Pin
];
