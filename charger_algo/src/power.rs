// Battery output sequencing and the reverse polarity interlock.

// Key Features:
// - Switching the output on resets all measurement state exactly once
// - A full measurement is forced right after power on, from one immediate sample
// - Reverse polarity is judged on instantaneous raw values

// Licensed under the Apache License, Version 2.0

use crate::calibration::CalibrationStorage;
use crate::channel::Name;
use crate::interfaces::{BatteryOutput, Board};
use crate::AnalogInputs;

impl<'a, S: CalibrationStorage> AnalogInputs<'a, S> {
    /// Enables the battery output. No-op when already on.
    pub fn power_on<B: Board + ?Sized>(&mut self, board: &mut B) {
        if self.on {
            return;
        }
        board.set_battery_output(true);
        self.reset(board.milliseconds());
        self.on = true;
        self.do_full_measurement(board);
        info!("ANALOG: output on, Vout {}mV", self.vout());
    }

    /// Disables the battery output unconditionally.
    pub fn power_off<B: BatteryOutput + ?Sized>(&mut self, board: &mut B) {
        self.on = false;
        board.set_battery_output(false);
    }

    #[inline(always)]
    pub fn is_power_on(&self) -> bool {
        self.on
    }

    /// Reverse polarity sense exceeds the output sense by more than the
    /// configured raw threshold.
    pub fn is_reverse_polarity(&self) -> bool {
        let reverse = self.samples.adc(Name::VreversePolarity);
        let out = self.samples.adc(Name::Vout);
        reverse.saturating_sub(out) > self.config.reverse_polarity_min
    }

    /// Runs a full measurement from one sample taken now, discarding the
    /// partially accumulated window.
    pub fn do_full_measurement<B: Board + ?Sized>(&mut self, board: &mut B) {
        let raw = board.sample_now();
        self.samples.clear();
        self.samples.add_sample(&raw);
        self.finalize_full_measurement(board);
    }
}
