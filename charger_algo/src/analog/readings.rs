// Real-value table with per-channel stability tracking.

// Key Features:
// - One calibrated value per channel, physical and virtual
// - Every write goes through `update`, which counts consecutive in-tolerance windows
// - Values persist until overwritten, consumers always read the last good value

// Licensed under the Apache License, Version 2.0

use crate::channel::{Name, ALL_INPUTS};
use crate::interfaces::Balancer;
use crate::Value;

/// Calibrated values and their stability counters.
pub struct Readings {
    /// Real (unit-converted) value per channel
    real: [Value; ALL_INPUTS],
    /// Consecutive updates that stayed within `stable_value_error`
    stable_count: [u16; ALL_INPUTS],
    /// Largest change still counted as stable
    stable_value_error: Value,
    /// Count at which a channel is considered stable
    stable_min_count: u16,
}

impl Readings {
    pub const fn new(stable_value_error: Value, stable_min_count: u16) -> Self {
        Self {
            real: [0; ALL_INPUTS],
            stable_count: [0; ALL_INPUTS],
            stable_value_error,
            stable_min_count,
        }
    }

    /// Stores `value` and advances or resets the channel's stability counter.
    pub fn update(&mut self, name: Name, value: Value) {
        let i = name.index();
        let change = self.real[i].abs_diff(value);
        self.store(i, value, change);
    }

    /// `update` for a channel holding a signed quantity; the tolerance is
    /// checked on the signed difference.
    pub fn update_signed(&mut self, name: Name, value: i16) {
        let i = name.index();
        let change = (self.real[i] as i16).abs_diff(value);
        self.store(i, value as Value, change);
    }

    fn store(&mut self, i: usize, value: Value, change: u16) {
        if change > self.stable_value_error {
            self.stable_count[i] = 0;
        } else {
            self.stable_count[i] = self.stable_count[i].saturating_add(1);
        }
        self.real[i] = value;
    }

    /// Marks a channel unsettled without touching its value.
    pub fn invalidate(&mut self, name: Name) {
        self.stable_count[name.index()] = 0;
    }

    #[inline(always)]
    pub fn get(&self, name: Name) -> Value {
        self.real[name.index()]
    }

    /// Value of a channel holding a signed quantity (two's complement).
    #[inline(always)]
    pub fn get_signed(&self, name: Name) -> i16 {
        self.real[name.index()] as i16
    }

    #[inline(always)]
    pub fn stable_count(&self, name: Name) -> u16 {
        self.stable_count[name.index()]
    }

    #[inline(always)]
    pub fn is_stable(&self, name: Name) -> bool {
        self.stable_count[name.index()] >= self.stable_min_count
    }

    /// Output voltage, output current and the balancer have all settled.
    pub fn is_output_stable<B: Balancer + ?Sized>(&self, balancer: &B) -> bool {
        self.is_stable(Name::VoutBalancer) && self.is_stable(Name::Iout) && balancer.is_stable()
    }

    /// The whole value table, indexed by `Name::index`.
    pub fn values(&self) -> &[Value; ALL_INPUTS] {
        &self.real
    }

    /// Zeroes every stability counter.
    pub fn reset_stable(&mut self) {
        self.stable_count = [0; ALL_INPUTS];
    }

    /// Zeroes every value and counter.
    pub fn clear(&mut self) {
        self.real = [0; ALL_INPUTS];
        self.reset_stable();
    }
}
