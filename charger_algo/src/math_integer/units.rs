// Fixed-point unit conventions shared by the whole measurement pipeline.
//
// Every value in the real-value table is a `Value` (u16) in one of these units:
//   voltage      - millivolts
//   current      - milliamps
//   temperature  - 0.01 degC
//   charge       - milliamp-hours
//   power        - 0.01 W            (mA * mV / POWER_SCALE)
//   energy       - 0.01 Wh           (mAh * mV / ENERGY_SCALE)

// Licensed under the Apache License, Version 2.0

use crate::Value;

/// Millivolts per volt.
pub const VOLT: u32 = 1000;
/// Milliamps per amp.
pub const AMP: u32 = 1000;
/// Hundredths of a degree per degree.
pub const CELSIUS: u32 = 100;

/// Divider turning `mA * mV` (µW) into 0.01 W.
pub const POWER_SCALE: u32 = 10_000;
/// Divider turning `mAh * mV` (µWh) into 0.01 Wh.
pub const ENERGY_SCALE: u32 = 10_000;

/// Microseconds per second, used when deriving tick rates.
pub const MICROS_PER_SECOND: u64 = 1_000_000;
/// Seconds per hour, used by the charge conversion.
pub const SECONDS_PER_HOUR: u64 = 3600;

/// Output power from current [mA] and voltage [mV], in 0.01 W.
pub const fn power(current_ma: Value, voltage_mv: Value) -> Value {
    scaled_product(current_ma, voltage_mv, POWER_SCALE)
}

/// Output energy from charge [mAh] and voltage [mV], in 0.01 Wh.
pub const fn energy(charge_mah: Value, voltage_mv: Value) -> Value {
    scaled_product(charge_mah, voltage_mv, ENERGY_SCALE)
}

/// `a * b / scale` in 32 bits, saturated to `Value`.
#[inline(always)]
const fn scaled_product(a: Value, b: Value, scale: u32) -> Value {
    let product = (a as u32 * b as u32) / scale; // fits: 65535 * 65535 < u32::MAX
    if product > Value::MAX as u32 {
        Value::MAX
    } else {
        product as Value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_and_energy_scaling() {
        // 2 A at 12.6 V = 25.2 W
        assert_eq!(power(2000, 12_600), 2520);
        // 1500 mAh at 4.0 V = 6 Wh
        assert_eq!(energy(1500, 4000), 600);
        assert_eq!(power(0, 12_600), 0);
    }

    #[test]
    fn power_saturates() {
        assert_eq!(power(Value::MAX, Value::MAX), Value::MAX);
        assert_eq!(energy(40_000, 20_000), Value::MAX);
    }
}
