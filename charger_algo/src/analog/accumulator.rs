// Implements the main averaging window of the physical channels.

// Licensed under the Apache License, Version 2.0

use crate::analog::acquisition::RawSamples;
use crate::channel::{Name, PHYSICAL_INPUTS};
use crate::math_integer::saturating::average;
use crate::Value;

/// Running per-channel sums of the current averaging window.
pub struct SampleAccumulator {
    /// Sum of raw samples per physical channel
    sum: [u32; PHYSICAL_INPUTS],
    /// Samples accumulated since the last clear (shared by all channels)
    count: u16,
    /// Most recent instantaneous vector
    last: RawSamples,
}

impl SampleAccumulator {
    pub const fn new() -> Self {
        Self {
            sum: [0; PHYSICAL_INPUTS],
            count: 0,
            last: RawSamples::new([0; PHYSICAL_INPUTS]),
        }
    }

    /// Adds one acquisition tick.
    pub fn add_sample(&mut self, samples: &RawSamples) {
        for (sum, &value) in self.sum.iter_mut().zip(samples.values()) {
            *sum = sum.saturating_add(value as u32); // a u16 window of u16 samples fits u32
        }
        self.count = self.count.wrapping_add(1);
        self.last = *samples;
    }

    /// Zeroes the sums and the sample counter.
    pub fn clear(&mut self) {
        self.sum = [0; PHYSICAL_INPUTS];
        self.count = 0;
    }

    /// Forgets the last instantaneous vector.
    pub fn reset_adc(&mut self) {
        self.last = RawSamples::default();
    }

    /// Samples in the current window.
    #[inline(always)]
    pub fn count(&self) -> u16 {
        self.count
    }

    /// True once the window holds `window` samples.
    #[inline(always)]
    pub fn is_complete(&self, window: u16) -> bool {
        self.count >= window
    }

    /// Window mean of a physical channel (0 for virtual channels or an empty window).
    pub fn average(&self, name: Name) -> Value {
        match self.sum.get(name.index()) {
            Some(&sum) => average(sum as u64, self.count as u32),
            None => 0,
        }
    }

    /// Last instantaneous raw value of a physical channel.
    #[inline(always)]
    pub fn adc(&self, name: Name) -> Value {
        self.last.get(name)
    }
}

impl Default for SampleAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_mean_after_full_window() {
        const WINDOW: u16 = 100;
        let mut acc = SampleAccumulator::new();
        let mut expected_sum = 0u32;
        for i in 0..WINDOW {
            let v = 30_000 + i * 7;
            expected_sum += v as u32;
            acc.add_sample(&RawSamples::splat(0).with(Name::Vout, v).with(Name::Ismps, 65_535));
            assert_eq!(acc.is_complete(WINDOW), i + 1 == WINDOW);
        }
        assert_eq!(acc.count(), WINDOW);
        assert_eq!(acc.average(Name::Vout), (expected_sum / WINDOW as u32) as Value);
        assert_eq!(acc.average(Name::Ismps), 65_535);
        assert_eq!(acc.average(Name::Tintern), 0);
        assert_eq!(acc.adc(Name::Vout), 30_000 + 99 * 7);
    }

    #[test]
    fn clear_keeps_last_vector() {
        let mut acc = SampleAccumulator::new();
        acc.add_sample(&RawSamples::splat(10));
        acc.add_sample(&RawSamples::splat(20));
        acc.clear();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.average(Name::Vout), 0);
        assert_eq!(acc.adc(Name::Vout), 20);
        acc.reset_adc();
        assert_eq!(acc.adc(Name::Vout), 0);
    }

    #[test]
    fn virtual_channel_has_no_average() {
        let mut acc = SampleAccumulator::new();
        acc.add_sample(&RawSamples::splat(10));
        assert_eq!(acc.average(Name::Pout), 0);
    }
}
