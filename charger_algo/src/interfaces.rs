//!
//! Collaborators the measurement core talks to.
//!
//! The core never owns hardware. Every operation that needs the clock, the
//! battery switch, a raw sample or the status of a power stage takes a
//! `board` implementing the matching trait. Firmware implements them on top
//! of the HAL; tests implement them on plain structs.
//!

use crate::analog::acquisition::RawSamples;
use crate::snapshot::Snapshot;

/// Free-running millisecond timer.
pub trait Clock {
    /// Milliseconds since boot, wrapping.
    fn milliseconds(&self) -> u32;
}

/// Battery output switch.
pub trait BatteryOutput {
    fn set_battery_output(&mut self, enabled: bool);
}

/// Immediate raw sample of every physical channel.
pub trait SampleSource {
    fn sample_now(&mut self) -> RawSamples;
}

/// On/off status of the power stages feeding the output.
pub trait PowerStages {
    fn is_discharge_powered_on(&self) -> bool;
    fn is_charge_powered_on(&self) -> bool;
}

/// Balancer stage.
pub trait Balancer {
    /// Balancer has finished settling the cells.
    fn is_stable(&self) -> bool;
}

/// Best-effort sink for a full measurement (serial log, telemetry).
pub trait MeasurementLog {
    fn send(&mut self, _snapshot: &Snapshot<'_>) {}
}

/// Everything the core needs from the board.
pub trait Board: Clock + BatteryOutput + SampleSource + PowerStages + Balancer + MeasurementLog {}

impl<T> Board for T where T: Clock + BatteryOutput + SampleSource + PowerStages + Balancer + MeasurementLog {}
