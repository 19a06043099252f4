// Implements the virtual channels computed once per full averaging window.

// Key Features:
// - Balancer segment voltages from direct or simplified tap wiring
// - Output voltage taken from the balancer string when it agrees with the
//   direct sense, otherwise from the direct sense
// - Output current taken from whichever power stage is running
// - Charge, power and energy derived in the shared fixed-point units

// Detailed Operation:
// Runs after the physical channels of the window are calibrated. Steps, in order:
//   1. Segment voltages Vb1..Vb6 from the tap pins
//   2. Connected ports: longest prefix of connected segments
//   3. Balancer sum over the connected ports
//   4. Source selection with fallback to Vout when the balancer is absent
//      or reads more than `DISAGREEMENT_MARGIN` below Vout
//   5. Output current from the discharger, then the SMPS, else 0
//   6. Charge from the integrator
//   7. Power and energy
// Every channel is written through `Readings::update`.

// Licensed under the Apache License, Version 2.0

use crate::analog::readings::Readings;
use crate::channel::{Kind, Name, BALANCE_PORTS};
use crate::config::BalancerWiring;
use crate::interfaces::PowerStages;
use crate::math_integer::units::{self, AMP, VOLT};
use crate::Value;

/// A current channel above this is connected [mA].
pub const CONNECTED_MIN_CURRENT: Value = (AMP / 20) as Value;
/// A voltage channel above this is connected [mV].
pub const CONNECTED_MIN_VOLTAGE: Value = (VOLT * 6 / 10) as Value;
/// Largest excess of Vout over the balancer sum still trusted [mV].
pub const DISAGREEMENT_MARGIN: Value = VOLT as Value;

/// Channel chosen as the output voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputSource {
    /// Direct output sense
    Vout,
    /// Sum of the connected balancer segments
    Vbalancer,
}

impl OutputSource {
    /// Channel the source is published as in `VobInfo`.
    pub const fn name(self) -> Name {
        match self {
            OutputSource::Vout => Name::Vout,
            OutputSource::Vbalancer => Name::Vbalancer,
        }
    }

    /// Decodes a `VobInfo` value.
    pub fn from_value(value: Value) -> Self {
        if value == Name::Vbalancer.index() as Value {
            OutputSource::Vbalancer
        } else {
            OutputSource::Vout
        }
    }
}

/// Channel reads above its kind's connection threshold.
pub fn is_connected(readings: &Readings, name: Name) -> bool {
    let value = readings.get(name);
    match name.kind() {
        Kind::Current => value > CONNECTED_MIN_CURRENT,
        Kind::Voltage => value > CONNECTED_MIN_VOLTAGE,
        _ => true,
    }
}

/// Length of the leading run of connected balancer segments.
pub fn connected_balance_ports(readings: &Readings) -> usize {
    Name::BALANCER_SEGMENTS
        .iter()
        .take_while(|&&segment| is_connected(readings, segment))
        .count()
}

/// Step 1: segment voltages from the tap pins.
fn assemble_segments(readings: &mut Readings, wiring: BalancerWiring) {
    let direct_from = match wiring {
        BalancerWiring::Direct => 0,
        BalancerWiring::SimplifiedVb0Vb2 => {
            let vb0 = readings.get(Name::Vb0Pin);
            let vb1 = readings.get(Name::Vb1Pin);
            let vb2 = readings.get(Name::Vb2Pin);
            readings.update(Name::Vb1, vb1.saturating_sub(vb0));
            readings.update(Name::Vb2, vb2.saturating_sub(vb1));
            2
        }
    };
    for i in direct_from..BALANCE_PORTS {
        let pin = readings.get(Name::BALANCER_PINS[i + 1]);
        readings.update(Name::BALANCER_SEGMENTS[i], pin);
    }
}

/// Runs steps 1..7 and returns the selected source.
pub fn compose<P: PowerStages + ?Sized>(
    readings: &mut Readings,
    wiring: BalancerWiring,
    stages: &P,
    charge: Value,
) -> OutputSource {
    assemble_segments(readings, wiring);

    let mut ports = connected_balance_ports(readings);
    let balancer = Name::BALANCER_SEGMENTS[..ports]
        .iter()
        .fold(0, |sum: Value, &segment| sum.saturating_add(readings.get(segment)));
    readings.update(Name::Vbalancer, balancer);

    let direct = readings.get(Name::Vout);
    let source = if balancer == 0 || direct.saturating_sub(balancer) > DISAGREEMENT_MARGIN {
        ports = 0;
        OutputSource::Vout
    } else {
        OutputSource::Vbalancer
    };
    let out = match source {
        OutputSource::Vout => direct,
        OutputSource::Vbalancer => balancer,
    };
    readings.update(Name::VoutBalancer, out);
    readings.update(Name::VbalanceInfo, ports as Value);
    readings.update(Name::VobInfo, source.name().index() as Value);

    let current = if stages.is_discharge_powered_on() {
        readings.get(Name::Idischarge)
    } else if stages.is_charge_powered_on() {
        readings.get(Name::Ismps)
    } else {
        0
    };
    readings.update(Name::Iout, current);
    readings.update(Name::Cout, charge);

    readings.update(Name::Pout, units::power(current, out));
    readings.update(Name::Eout, units::energy(charge, out));
    source
}
