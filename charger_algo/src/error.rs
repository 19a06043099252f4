//!
//! Errors reported by the measurement core.
//!
//! Runtime measurement faults are handled by clamping or keeping the last
//! good value; only calibration updates and startup configuration return
//! errors to the caller.
//!

use core::fmt;

use crate::channel::Name;

/// Calibration model faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Both calibration points of `name` share the same raw coordinate,
    /// the linear map would divide by zero.
    DegeneratePoints { name: Name },
}

/// Startup configuration faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The averaging window must hold at least one sample
    ZeroWindow,
    /// The delta window interval must be non-zero
    ZeroDeltaInterval,
    /// The acquisition tick period must be non-zero
    ZeroTickPeriod,
    /// The slow tick must fire every N >= 1 acquisition ticks
    ZeroSlowInterval,
    /// Slow ticks per hour is not an integer for these periods,
    /// charge readings would drift
    ChargeScaleInexact {
        tick_period_us: u32,
        slow_tick_interval: u32,
    },
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::DegeneratePoints { name } => {
                write!(f, "calibration points of {:?} share the same raw value", name)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroWindow => f.write_str("averaging window is empty"),
            ConfigError::ZeroDeltaInterval => f.write_str("delta window interval is zero"),
            ConfigError::ZeroTickPeriod => f.write_str("acquisition tick period is zero"),
            ConfigError::ZeroSlowInterval => f.write_str("slow tick interval is zero"),
            ConfigError::ChargeScaleInexact {
                tick_period_us,
                slow_tick_interval,
            } => write!(
                f,
                "{} us tick every {} ticks gives a fractional slow-tick rate per hour",
                tick_period_us, slow_tick_interval
            ),
        }
    }
}
