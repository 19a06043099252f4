// Runtime configuration of the measurement core.

// Key Features:
// - Window sizes, tick periods and stability limits in one place
// - Balancer wiring selected at startup instead of at build time
// - `validate()` checks period relationships once, before any measurement

// Licensed under the Apache License, Version 2.0

use crate::analog::charge::ChargeScale;
use crate::error::ConfigError;
use crate::Value;

/// Tick period the default charge divider assumes.
pub const CANONICAL_TICK_PERIOD_US: u32 = 500;

/// Delta window length rates are normalised to.
pub const CANONICAL_DELTA_TIME_MS: u32 = 60_000;

/// How the balancer taps are wired to the ADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BalancerWiring {
    /// Each segment voltage is sensed directly on its own pin
    Direct,
    /// Taps 0..2 are sensed against ground, cells 1 and 2 are the
    /// differences between adjacent taps; cells 3..6 are direct
    SimplifiedVb0Vb2,
}

/// Measurement core configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Samples per full averaging window
    pub avr_max_count: u16,
    /// Delta window length [ms]
    pub delta_time_ms: u32,
    /// Acquisition tick period [us]
    pub tick_period_us: u32,
    /// Acquisition ticks per slow tick
    pub slow_tick_interval: u32,
    /// Balancer tap wiring
    pub balancer_wiring: BalancerWiring,
    /// Minimum raw excess of the reverse polarity sense over Vout
    pub reverse_polarity_min: Value,
    /// Largest change between windows still counted as stable
    pub stable_value_error: Value,
    /// Consecutive stable windows needed to call a channel stable
    pub stable_min_count: u16,
}

impl Config {
    /// Default configuration for the reference board.
    pub const fn new() -> Self {
        Self {
            avr_max_count: 100,
            delta_time_ms: CANONICAL_DELTA_TIME_MS,
            tick_period_us: CANONICAL_TICK_PERIOD_US,
            slow_tick_interval: 16,
            balancer_wiring: BalancerWiring::Direct,
            reverse_polarity_min: 3000,
            stable_value_error: 6,
            stable_min_count: 3,
        }
    }

    /// Checks the period relationships and derives the charge scaling.
    pub fn validate(&self) -> Result<ChargeScale, ConfigError> {
        if self.avr_max_count == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.delta_time_ms == 0 {
            return Err(ConfigError::ZeroDeltaInterval);
        }
        let scale = ChargeScale::from_periods(self.tick_period_us, self.slow_tick_interval)?;
        if self.tick_period_us != CANONICAL_TICK_PERIOD_US {
            warn!(
                "CONFIG: tick period {}us differs from {}us, charge divider {}",
                self.tick_period_us,
                CANONICAL_TICK_PERIOD_US,
                scale.divider()
            );
        }
        if self.delta_time_ms != CANONICAL_DELTA_TIME_MS {
            warn!(
                "CONFIG: delta window {}ms, temperature rate rescaled to {}ms",
                self.delta_time_ms,
                CANONICAL_DELTA_TIME_MS
            );
        }
        Ok(scale)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
