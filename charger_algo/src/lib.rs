// Analog measurement core of a battery charger.

// Key Features:
// - Raw ADC vectors averaged over a fixed window and calibrated per channel
// - Stability tracking on every calibrated and derived channel
// - Balancer-aware output voltage, output current, charge, power and energy
// - A wall-clock delta window for voltage sag and temperature rise
// - Battery output sequencing with an immediate first measurement

// Detailed Operation:
// The acquisition interrupt pushes one `RawSamples` per tick into a
// `SampleQueue`. The main loop owns the single `AnalogInputs` context and
// drains the queue through `drain`, which feeds the averaging window and the
// delta window. Every `avr_max_count` samples the window is calibrated,
// derived channels are composed and the new values are published. A slow
// timer interrupt drives the shared `ChargeIntegrator` independently.

// Licensed under the Apache License, Version 2.0

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod analog;
pub mod calibration;
pub mod channel;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod math_integer;
mod power;
pub mod snapshot;

pub use analog::acquisition::{split, RawSamples, SampleConsumer, SampleProducer, SampleQueue};
pub use analog::charge::{ChargeIntegrator, ChargeScale};
pub use analog::composer::OutputSource;
pub use calibration::{CalibrationPoint, CalibrationStorage, CalibrationTable, SharedStorage};
pub use channel::{Kind, Name, ALL_INPUTS, BALANCE_PORTS, PHYSICAL_INPUTS};
pub use config::{BalancerWiring, Config};
pub use error::{CalibrationError, ConfigError};
pub use interfaces::Board;
pub use snapshot::{AnalogValue, Snapshot};

use analog::accumulator::SampleAccumulator;
use analog::composer;
use analog::delta::DeltaWindow;
use analog::readings::Readings;
use calibration::{is_valid_pair, PointPair, MAX_CALIBRATION_POINTS};
use interfaces::{Balancer, Clock, MeasurementLog, PowerStages};

/// Width of every sampled and computed value.
pub type Value = u16;

/// Measurement context: the one owner of all measurement state.
pub struct AnalogInputs<'a, S: CalibrationStorage> {
    config: Config,
    charge_scale: ChargeScale,
    storage: S,
    /// Shared with the slow timer interrupt
    charge: &'a ChargeIntegrator,

    samples: SampleAccumulator,
    /// Raw averages of the last full window
    avr_adc: [Value; PHYSICAL_INPUTS],
    readings: Readings,
    delta: DeltaWindow,
    /// Source selected by the last full measurement
    source: OutputSource,
    /// Full measurements since the last reset
    calculation_count: u16,
    /// Battery output switch state
    on: bool,
}

impl<'a, S: CalibrationStorage> AnalogInputs<'a, S> {
    /// Validates `config` and builds a context in the reset state.
    pub fn new(config: Config, storage: S, charge: &'a ChargeIntegrator) -> Result<Self, ConfigError> {
        let charge_scale = config.validate()?;
        info!(
            "ANALOG: window {} samples, delta {}ms, charge divider {}",
            config.avr_max_count,
            config.delta_time_ms,
            charge_scale.divider()
        );
        Ok(Self {
            config,
            charge_scale,
            storage,
            charge,
            samples: SampleAccumulator::new(),
            avr_adc: [0; PHYSICAL_INPUTS],
            readings: Readings::new(config.stable_value_error, config.stable_min_count),
            delta: DeltaWindow::new(config.delta_time_ms),
            source: OutputSource::Vout,
            calculation_count: 0,
            on: false,
        })
    }

    /// Startup reset, timing the first delta window from `clock`.
    pub fn initialize<C: Clock + ?Sized>(&mut self, clock: &C) {
        self.reset(clock.milliseconds());
    }

    /// Clears all measurement state: both windows, stability, values and charge.
    pub fn reset(&mut self, now_ms: u32) {
        self.calculation_count = 0;
        self.charge.reset();
        self.samples.reset_adc();
        self.samples.clear();
        self.readings.clear();
        self.delta.reset(now_ms);
        self.avr_adc = [0; PHYSICAL_INPUTS];
        self.source = OutputSource::Vout;
    }

    /// Processes one acquisition tick.
    pub fn finalize_measurement<B>(&mut self, raw: &RawSamples, board: &mut B)
    where
        B: Clock + PowerStages + MeasurementLog + ?Sized,
    {
        self.samples.add_sample(raw);

        let vout = match self.source {
            OutputSource::Vbalancer => self.readings.get(Name::VoutBalancer),
            OutputSource::Vout => raw.get(Name::Vout),
        };
        self.delta.add(self.source, vout, raw.get(Name::Textern));
        let now = board.milliseconds();
        if self.delta.is_due(now) {
            self.finalize_delta(now);
        }

        if self.samples.is_complete(self.config.avr_max_count) {
            self.finalize_full_measurement(board);
        }
    }

    /// Processes every queued acquisition tick; returns how many were taken.
    pub fn drain<B, const N: usize>(&mut self, queue: &mut SampleConsumer<'_, N>, board: &mut B) -> usize
    where
        B: Clock + PowerStages + MeasurementLog + ?Sized,
    {
        let mut taken = 0;
        while let Some(raw) = queue.pop() {
            self.finalize_measurement(&raw, board);
            taken += 1;
        }
        taken
    }

    /// Closes the delta window and publishes its channels.
    fn finalize_delta(&mut self, now_ms: u32) {
        let averages = self.delta.take(now_ms);
        let vout = match averages.source {
            OutputSource::Vbalancer => Ok(averages.vout),
            OutputSource::Vout => self.calibrate(Name::Vout, averages.vout),
        };
        match vout {
            Ok(vout) => self.delta.apply_voltage(&mut self.readings, vout),
            Err(e) => {
                error!("ANALOG: delta Vout dropped: {}", e);
                self.readings.invalidate(Name::DeltaVout);
            }
        }
        match self.calibrate(Name::Textern, averages.textern) {
            Ok(t) => self.delta.apply_temperature(&mut self.readings, t),
            Err(e) => {
                error!("ANALOG: delta Textern dropped: {}", e);
                self.readings.invalidate(Name::DeltaTextern);
            }
        }
        self.delta.apply_count(&mut self.readings, averages.count);
        trace!("ANALOG: delta window {} closed, {} samples", self.delta.delta_count(), averages.count);
    }

    /// Calibrates the averaging window, composes derived channels, publishes
    /// the output current and the snapshot, then starts the next window.
    pub fn finalize_full_measurement<B>(&mut self, board: &mut B)
    where
        B: PowerStages + MeasurementLog + ?Sized,
    {
        self.calculation_count = self.calculation_count.wrapping_add(1);
        for name in Name::physical() {
            let avr = self.samples.average(name);
            self.avr_adc[name.index()] = avr;
            match self.calibrate(name, avr) {
                Ok(real) => self.readings.update(name, real),
                Err(e) => {
                    // last good value stays, but is no longer stable
                    error!("ANALOG: {}", e);
                    self.readings.invalidate(name);
                }
            }
        }

        let charge = self.charge.read(self.charge_scale);
        self.source = composer::compose(&mut self.readings, self.config.balancer_wiring, &*board, charge);
        self.charge.publish_output_current(self.readings.get(Name::Iout));

        board.send(&Snapshot::new(self.calculation_count, &self.readings, &self.avr_adc));
        self.samples.clear();
    }

    // ####### Calibration ########

    fn points(&self, name: Name) -> PointPair {
        if name.is_physical() {
            self.storage.read_points(name)
        } else {
            [CalibrationPoint::IDENTITY; MAX_CALIBRATION_POINTS]
        }
    }

    /// Physical value of a raw reading of `name`.
    pub fn calibrate(&self, name: Name, raw: Value) -> Result<Value, CalibrationError> {
        calibration::calibrate(name, &self.points(name), raw)
    }

    /// Raw reading of `name` that calibrates to `physical`.
    pub fn reverse_calibrate(&self, name: Name, physical: Value) -> Result<Value, CalibrationError> {
        calibration::reverse_calibrate(name, &self.points(name), physical)
    }

    /// Anchor `index` of `name`; out-of-range lookups give the identity point.
    pub fn calibration_point(&self, name: Name, index: usize) -> CalibrationPoint {
        if index >= MAX_CALIBRATION_POINTS {
            return CalibrationPoint::IDENTITY;
        }
        self.points(name)[index]
    }

    /// Stores anchor `index` of `name`. Out-of-range writes are ignored; a
    /// write leaving both anchors on the same raw value is rejected.
    pub fn set_calibration_point(
        &mut self,
        name: Name,
        index: usize,
        point: CalibrationPoint,
    ) -> Result<(), CalibrationError> {
        if !name.is_physical() || index >= MAX_CALIBRATION_POINTS {
            return Ok(());
        }
        self.storage.modify_points(name, |pair| {
            pair[index] = point;
            if is_valid_pair(pair) {
                Ok(())
            } else {
                warn!("ANALOG: rejected calibration point {} of {}", index, name);
                Err(CalibrationError::DegeneratePoints { name })
            }
        })
    }

    /// Copies the firmware defaults over every physical channel.
    pub fn restore_defaults(&mut self) {
        for name in Name::physical() {
            let defaults = self.storage.default_points(name);
            self.storage.write_points(name, &defaults);
        }
        info!("ANALOG: calibration restored to defaults");
    }

    // ####### Values ########

    /// Calibrated value of `name`.
    #[inline(always)]
    pub fn real_value(&self, name: Name) -> Value {
        self.readings.get(name)
    }

    /// Raw average of `name` over the last full window.
    pub fn avr_adc_value(&self, name: Name) -> Value {
        self.avr_adc.get(name.index()).copied().unwrap_or(0)
    }

    /// Last instantaneous raw value of `name`.
    #[inline(always)]
    pub fn adc_value(&self, name: Name) -> Value {
        self.samples.adc(name)
    }

    /// Value of `name` with its kind, for printing.
    pub fn analog_value(&self, name: Name) -> AnalogValue {
        AnalogValue::of(name, self.readings.get(name))
    }

    #[inline(always)]
    pub fn kind(&self, name: Name) -> Kind {
        name.kind()
    }

    #[inline(always)]
    pub fn is_stable(&self, name: Name) -> bool {
        self.readings.is_stable(name)
    }

    #[inline(always)]
    pub fn stable_count(&self, name: Name) -> u16 {
        self.readings.stable_count(name)
    }

    /// Output voltage, output current and the balancer have all settled.
    pub fn is_output_stable<B: Balancer + ?Sized>(&self, balancer: &B) -> bool {
        self.readings.is_output_stable(balancer)
    }

    pub fn is_connected(&self, name: Name) -> bool {
        composer::is_connected(&self.readings, name)
    }

    /// Leading run of connected balancer segments.
    pub fn connected_balance_ports(&self) -> usize {
        composer::connected_balance_ports(&self.readings)
    }

    /// Selected output voltage [mV].
    pub fn vout(&self) -> Value {
        self.readings.get(Name::VoutBalancer)
    }

    /// Output current [mA].
    pub fn iout(&self) -> Value {
        self.readings.get(Name::Iout)
    }

    /// Output charge of the last full measurement [mAh].
    pub fn cout(&self) -> Value {
        self.readings.get(Name::Cout)
    }

    /// Output power [0.01 W].
    pub fn pout(&self) -> Value {
        self.readings.get(Name::Pout)
    }

    /// Output energy [0.01 Wh].
    pub fn eout(&self) -> Value {
        self.readings.get(Name::Eout)
    }

    /// Charge accumulated right now [mAh].
    pub fn charge(&self) -> Value {
        self.charge.read(self.charge_scale)
    }

    /// Full measurements since the last reset; changes when new data is available.
    #[inline(always)]
    pub fn full_measurement_count(&self) -> u16 {
        self.calculation_count
    }

    /// Delta windows finished since the last reset.
    pub fn delta_count(&self) -> u16 {
        self.delta.delta_count()
    }

    pub fn output_source(&self) -> OutputSource {
        self.source
    }

    /// View of the last full measurement.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot::new(self.calculation_count, &self.readings, &self.avr_adc)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
