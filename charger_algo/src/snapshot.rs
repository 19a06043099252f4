//!
//! Read-only views of a finished measurement.
//!
//! `Snapshot` is what the measurement log receives once per full window;
//! `AnalogValue` pairs a value with its quantity kind so it can be printed
//! in physical units, either through `core::fmt` or through defmt.
//!

use core::fmt;

use crate::analog::readings::Readings;
use crate::channel::{Kind, Name, PHYSICAL_INPUTS};
use crate::math_integer::units;
use crate::Value;

/// A channel value in its physical unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogValue {
    /// Value in the kind's base unit (mV, mA, 0.01 degC)
    pub value: i32,
    pub kind: Kind,
}

impl AnalogValue {
    /// Interprets a table entry of `name`.
    pub fn of(name: Name, value: Value) -> Self {
        let value = match name {
            Name::DeltaTextern => value as i16 as i32,
            _ => value as i32,
        };
        Self {
            value,
            kind: name.kind(),
        }
    }
}

impl fmt::Display for AnalogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (scale, unit) = match self.kind {
            Kind::Voltage => (units::VOLT, 'V'),
            Kind::Current => (units::AMP, 'A'),
            Kind::Temperature => (units::CELSIUS, 'C'),
            Kind::Unknown => return write!(f, "{}", self.value),
        };
        let digits = scale.ilog10() as usize;
        let sign = if self.value < 0 { "-" } else { "" };
        let abs = self.value.unsigned_abs();
        write!(
            f,
            "{}{}.{:0width$}{}",
            sign,
            abs / scale,
            abs % scale,
            unit,
            width = digits
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AnalogValue {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", defmt::Display2Format(self))
    }
}

/// One finished full measurement.
pub struct Snapshot<'a> {
    /// Full measurements since the last reset, this one included
    pub count: u16,
    readings: &'a Readings,
    avr_adc: &'a [Value; PHYSICAL_INPUTS],
}

impl<'a> Snapshot<'a> {
    pub(crate) fn new(
        count: u16,
        readings: &'a Readings,
        avr_adc: &'a [Value; PHYSICAL_INPUTS],
    ) -> Self {
        Self {
            count,
            readings,
            avr_adc,
        }
    }

    /// Calibrated value of `name`.
    pub fn real(&self, name: Name) -> Value {
        self.readings.get(name)
    }

    /// Window-averaged raw value of a physical channel (0 for virtual ones).
    pub fn avr_adc(&self, name: Name) -> Value {
        self.avr_adc.get(name.index()).copied().unwrap_or(0)
    }

    pub fn is_stable(&self, name: Name) -> bool {
        self.readings.is_stable(name)
    }

    /// Every channel with its printable value.
    pub fn values(&self) -> impl Iterator<Item = (Name, AnalogValue)> + '_ {
        Name::all().map(move |name| (name, AnalogValue::of(name, self.readings.get(name))))
    }
}
