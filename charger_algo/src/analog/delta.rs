// Implements the delta window: a wall-clock timed average of the output
// voltage and the external temperature, producing their rates of change.

// Key Features:
// - Runs beside the main averaging window on its own time base
// - Output voltage drop is measured against the highest window seen so far
// - Temperature change is measured against the previous window and
//   normalised to a 60 s rate

// Detailed Operation:
// Every acquisition tick adds one output voltage sample (already in mV when
// the balancer is the selected source, raw otherwise) and one raw external
// temperature sample. The voltage sum only ever holds samples of one source:
// a source change restarts it. Once more than `interval_ms` have elapsed the
// window is taken: sums are averaged, cleared and the timer restarts. The
// caller calibrates the averages and hands the physical values to `apply`,
// which updates the delta channels through the stability tracker.

// Licensed under the Apache License, Version 2.0

use crate::analog::composer::OutputSource;
use crate::analog::readings::Readings;
use crate::channel::Name;
use crate::config::CANONICAL_DELTA_TIME_MS;
use crate::math_integer::saturating::average;
use crate::Value;

/// Averages of one finished delta window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WindowAverages {
    /// Source the voltage samples came from
    pub source: OutputSource,
    /// Output voltage average, raw or mV depending on `source`
    pub vout: Value,
    /// Voltage samples behind `vout`
    pub vout_count: u32,
    /// Raw external temperature average
    pub textern: Value,
    /// Samples in the window
    pub count: u32,
}

/// Delta window state.
pub struct DeltaWindow {
    /// Window length [ms]
    interval_ms: u32,
    /// Start of the running window [ms]
    start_ms: u32,
    /// Source of the samples in `sum_vout`
    source: OutputSource,
    /// Sum of output voltage samples
    sum_vout: u64,
    /// Samples in `sum_vout`
    vout_count: u32,
    /// Sum of raw external temperature samples
    sum_textern: u64,
    /// Samples in the running window
    count: u32,
    /// Calibrated temperature of the previous window
    last_textern: Option<Value>,
    /// Windows finished since the last reset
    delta_count: u16,
}

impl DeltaWindow {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            start_ms: 0,
            source: OutputSource::Vout,
            sum_vout: 0,
            vout_count: 0,
            sum_textern: 0,
            count: 0,
            last_textern: None,
            delta_count: 0,
        }
    }

    /// Clears everything and starts a window at `now_ms`.
    pub fn reset(&mut self, now_ms: u32) {
        *self = Self {
            start_ms: now_ms,
            ..Self::new(self.interval_ms)
        };
    }

    /// Adds one acquisition tick. `vout` is in the unit of `source`.
    pub fn add(&mut self, source: OutputSource, vout: Value, textern_raw: Value) {
        if source != self.source {
            self.source = source;
            self.sum_vout = 0;
            self.vout_count = 0;
        }
        self.sum_vout = self.sum_vout.saturating_add(vout as u64);
        self.vout_count = self.vout_count.saturating_add(1);
        self.sum_textern = self.sum_textern.saturating_add(textern_raw as u64);
        self.count = self.count.saturating_add(1);
    }

    /// More than `interval_ms` elapsed since the window started.
    #[inline(always)]
    pub fn is_due(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.start_ms) > self.interval_ms
    }

    /// Closes the running window and starts the next one at `now_ms`.
    pub fn take(&mut self, now_ms: u32) -> WindowAverages {
        let taken = WindowAverages {
            source: self.source,
            vout: average(self.sum_vout, self.vout_count),
            vout_count: self.vout_count,
            textern: average(self.sum_textern, self.count),
            count: self.count,
        };
        self.sum_vout = 0;
        self.vout_count = 0;
        self.sum_textern = 0;
        self.count = 0;
        self.start_ms = now_ms;
        self.delta_count = self.delta_count.wrapping_add(1);
        taken
    }

    /// Publishes the voltage part of a finished window.
    /// `vout` is the calibrated window average [mV].
    pub fn apply_voltage(&self, readings: &mut Readings, vout: Value) {
        let mut max = readings.get(Name::DeltaVoutMax);
        if vout >= max {
            readings.update(Name::DeltaVoutMax, vout);
            max = vout;
        }
        readings.update(Name::DeltaVout, max.saturating_sub(vout));
    }

    /// Publishes the temperature part of a finished window.
    /// `textern` is the calibrated window average [0.01 degC].
    pub fn apply_temperature(&mut self, readings: &mut Readings, textern: Value) {
        let delta = match self.last_textern.replace(textern) {
            Some(last) => self.per_minute(textern as i32 - last as i32),
            None => 0,
        };
        readings.update_signed(Name::DeltaTextern, delta);
    }

    /// Publishes the sample count of a finished window.
    pub fn apply_count(&self, readings: &mut Readings, count: u32) {
        let count = if count > Value::MAX as u32 {
            Value::MAX
        } else {
            count as Value
        };
        readings.update(Name::DeltaLastCount, count);
    }

    /// Rescales a change over `interval_ms` to a change per minute.
    fn per_minute(&self, change: i32) -> i16 {
        let rate = change as i64 * CANONICAL_DELTA_TIME_MS as i64 / self.interval_ms.max(1) as i64;
        rate.clamp(i16::MIN as i64, i16::MAX as i64) as i16
    }

    /// Windows finished since the last reset.
    #[inline(always)]
    pub fn delta_count(&self) -> u16 {
        self.delta_count
    }

    /// Samples in the running window.
    #[inline(always)]
    pub fn count(&self) -> u32 {
        self.count
    }
}
