// Board glue between the HAL and the measurement core.

// Licensed under the Apache License, Version 2.0

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;
use hal::gpio::Pin;

use charger_algo::interfaces::{Balancer, BatteryOutput, Clock, MeasurementLog, PowerStages, SampleSource};
use charger_algo::{AnalogValue, Name, RawSamples, Snapshot};

use crate::pinout;

/// Milliseconds since boot, advanced by the acquisition tick.
pub static MILLIS: AtomicU32 = AtomicU32::new(0);

/// Latest complete ADC vector, for immediate measurements.
pub static LATEST: Mutex<Cell<RawSamples>> = Mutex::new(Cell::new(RawSamples::splat(0)));

pub struct ChargerBoard {
    battery_output: Pin,
    discharge_enable: Pin,
    smps_enable: Pin,
    balancer_idle: Pin,
}

impl ChargerBoard {
    pub fn new() -> Self {
        let mut battery_output = pinout::BATTERY_OUTPUT.init();
        battery_output.set_low();
        for pin in pinout::ANALOG.iter() {
            pin.init();
        }
        Self {
            battery_output,
            discharge_enable: pinout::DISCHARGE_ENABLE.init(),
            smps_enable: pinout::SMPS_ENABLE.init(),
            balancer_idle: pinout::BALANCER_IDLE.init(),
        }
    }
}

impl Clock for ChargerBoard {
    fn milliseconds(&self) -> u32 {
        MILLIS.load(Ordering::Relaxed)
    }
}

impl BatteryOutput for ChargerBoard {
    fn set_battery_output(&mut self, enabled: bool) {
        if enabled {
            self.battery_output.set_high();
        } else {
            self.battery_output.set_low();
        }
    }
}

impl SampleSource for ChargerBoard {
    fn sample_now(&mut self) -> RawSamples {
        critical_section::with(|cs| LATEST.borrow(cs).get())
    }
}

impl PowerStages for ChargerBoard {
    fn is_discharge_powered_on(&self) -> bool {
        self.discharge_enable.is_high()
    }

    fn is_charge_powered_on(&self) -> bool {
        self.smps_enable.is_high()
    }
}

impl Balancer for ChargerBoard {
    fn is_stable(&self) -> bool {
        self.balancer_idle.is_high()
    }
}

impl MeasurementLog for ChargerBoard {
    fn send(&mut self, snapshot: &Snapshot<'_>) {
        defmt::debug!(
            "MEAS {}: Vout={} Iout={} Cout={}mAh Tint={}",
            snapshot.count,
            AnalogValue::of(Name::VoutBalancer, snapshot.real(Name::VoutBalancer)),
            AnalogValue::of(Name::Iout, snapshot.real(Name::Iout)),
            snapshot.real(Name::Cout),
            AnalogValue::of(Name::Tintern, snapshot.real(Name::Tintern)),
        );
    }
}
