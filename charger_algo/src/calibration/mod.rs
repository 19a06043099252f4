// Two-point linear calibration of the physical channels.

// Key Features:
// - Raw ADC averages are mapped to physical units through two (raw, physical) anchors
// - The inverse map turns a physical target back into a raw ADC value
// - Arithmetic is done in i64, negative results clamp to 0 and large ones saturate

// Detailed Operation:
// For anchors p0 and p1 the forward map is
//     y = p0.y + (x - p0.x) * (p1.y - p0.y) / (p1.x - p0.x)
// and the reverse map swaps the roles of x and y. Anchors whose divisor
// coordinate is equal make the map undefined; they are reported as
// `CalibrationError::DegeneratePoints` instead of being divided through.

// Licensed under the Apache License, Version 2.0

pub mod defaults;
pub mod storage;

pub use storage::{CalibrationStorage, CalibrationTable, SharedStorage};

use crate::channel::Name;
use crate::error::CalibrationError;
use crate::math_integer::saturating::clamp_to_value;
use crate::Value;

/// Anchors per channel.
pub const MAX_CALIBRATION_POINTS: usize = 2;

/// One anchor of a channel's linear map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationPoint {
    /// Raw ADC value
    pub x: Value,
    /// Physical value in the channel's unit
    pub y: Value,
}

impl CalibrationPoint {
    /// Point returned for out-of-range lookups.
    pub const IDENTITY: CalibrationPoint = CalibrationPoint { x: 1, y: 1 };

    pub const fn new(x: Value, y: Value) -> Self {
        Self { x, y }
    }
}

/// Both anchors of one channel.
pub type PointPair = [CalibrationPoint; MAX_CALIBRATION_POINTS];

/// True when the pair defines a usable forward map.
#[inline(always)]
pub fn is_valid_pair(pair: &PointPair) -> bool {
    pair[0].x != pair[1].x
}

/// Physical value of `raw` for channel `name`.
pub fn calibrate(name: Name, pair: &PointPair, raw: Value) -> Result<Value, CalibrationError> {
    let [p0, p1] = *pair;
    let dx = p1.x as i64 - p0.x as i64;
    if dx == 0 {
        return Err(CalibrationError::DegeneratePoints { name });
    }
    let dy = p1.y as i64 - p0.y as i64;
    let y = p0.y as i64 + (raw as i64 - p0.x as i64) * dy / dx;
    Ok(clamp_to_value(y))
}

/// Raw value that calibrates to `physical` for channel `name`.
pub fn reverse_calibrate(
    name: Name,
    pair: &PointPair,
    physical: Value,
) -> Result<Value, CalibrationError> {
    let [p0, p1] = *pair;
    let dy = p1.y as i64 - p0.y as i64;
    if dy == 0 {
        return Err(CalibrationError::DegeneratePoints { name });
    }
    let dx = p1.x as i64 - p0.x as i64;
    let x = p0.x as i64 + (physical as i64 - p0.y as i64) * dx / dy;
    Ok(clamp_to_value(x))
}
