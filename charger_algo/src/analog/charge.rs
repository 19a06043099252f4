// Implements the charge integrator: a slow-tick accumulator of output current.

// Key Features:
// - `tick()` is meant for the slow timer interrupt and never blocks
// - Output current is published by the main loop as a single atomic scalar
// - The wide accumulator is guarded by a critical section, so a 64-bit
//   read-modify-write is never torn on 32-bit cores

// Detailed Operation:
// Each slow tick adds the latest output current [mA] to the accumulator, so
// the accumulator holds mA * slow-ticks. Dividing by the number of slow ticks
// per hour (`ChargeScale`) yields mAh. The divider is derived once from the
// acquisition tick period and the slow tick interval, so other periods only
// change this one number.

// Licensed under the Apache License, Version 2.0

use core::cell::Cell;
use core::sync::atomic::{AtomicU16, Ordering};

use critical_section::Mutex;

use crate::error::ConfigError;
use crate::math_integer::units::{MICROS_PER_SECOND, SECONDS_PER_HOUR};
use crate::Value;

/// Conversion from accumulated current-ticks to mAh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeScale {
    /// Slow ticks per hour
    divider: u32,
}

impl ChargeScale {
    /// Derives the scaling from the acquisition tick period [us] and the number
    /// of acquisition ticks per slow tick.
    pub fn from_periods(tick_period_us: u32, slow_tick_interval: u32) -> Result<Self, ConfigError> {
        if tick_period_us == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if slow_tick_interval == 0 {
            return Err(ConfigError::ZeroSlowInterval);
        }
        let slow_period_us = tick_period_us as u64 * slow_tick_interval as u64;
        let us_per_hour = MICROS_PER_SECOND * SECONDS_PER_HOUR;
        if us_per_hour % slow_period_us != 0 {
            return Err(ConfigError::ChargeScaleInexact {
                tick_period_us,
                slow_tick_interval,
            });
        }
        Ok(Self {
            divider: (us_per_hour / slow_period_us) as u32, // at most 3.6e9
        })
    }

    /// Slow ticks per hour.
    #[inline(always)]
    pub fn divider(&self) -> u32 {
        self.divider
    }

    /// Converts an accumulator value to mAh, saturated to `Value`.
    pub fn to_mah(&self, accumulated: u64) -> Value {
        let mah = accumulated / self.divider as u64;
        if mah > Value::MAX as u64 {
            Value::MAX
        } else {
            mah as Value
        }
    }
}

/// Accumulates output current on the slow tick.
pub struct ChargeIntegrator {
    /// Latest output current [mA], written by the main loop
    output_current: AtomicU16,
    /// Sum of current samples [mA * slow tick]
    accumulator: Mutex<Cell<u64>>,
}

impl ChargeIntegrator {
    /// Creates an empty integrator; `const` so it can live in a `static`.
    pub const fn new() -> Self {
        Self {
            output_current: AtomicU16::new(0),
            accumulator: Mutex::new(Cell::new(0)),
        }
    }

    /// Slow tick: adds the published output current.
    pub fn tick(&self) {
        let current = self.output_current.load(Ordering::Relaxed) as u64;
        critical_section::with(|cs| {
            let acc = self.accumulator.borrow(cs);
            acc.set(acc.get().saturating_add(current));
        });
    }

    /// Publishes the output current sampled by the following ticks.
    #[inline(always)]
    pub fn publish_output_current(&self, current: Value) {
        self.output_current.store(current, Ordering::Relaxed);
    }

    /// Output current the next tick will add.
    #[inline(always)]
    pub fn output_current(&self) -> Value {
        self.output_current.load(Ordering::Relaxed)
    }

    /// Raw accumulator value [mA * slow tick].
    pub fn accumulated(&self) -> u64 {
        critical_section::with(|cs| self.accumulator.borrow(cs).get())
    }

    /// Accumulated charge [mAh].
    pub fn read(&self, scale: ChargeScale) -> Value {
        scale.to_mah(self.accumulated())
    }

    /// Clears the accumulator and the published current.
    pub fn reset(&self) {
        self.output_current.store(0, Ordering::Relaxed);
        critical_section::with(|cs| self.accumulator.borrow(cs).set(0));
    }
}

impl Default for ChargeIntegrator {
    fn default() -> Self {
        Self::new()
    }
}
