//! Pin assignments of the charger board.
use hal::gpio::{Pin, PinMode, Port};

/// Represents the definition of a GPIO pin.
pub struct PinDef {
    /// The port to which the pin belongs (e.g., Port::A, Port::B).
    port: Port,
    /// The pin number within the port.
    pin: u8,
    /// The mode of the pin (e.g., Output, Input, Alternate function).
    mode: PinMode,
}

impl PinDef {
    /// Configures the pin and hands it out.
    pub fn init(&self) -> Pin {
        Pin::new(self.port, self.pin, self.mode)
    }
}

/// Battery output relay
pub const BATTERY_OUTPUT: PinDef = PinDef {
    port: Port::B,
    pin: 2,
    mode: PinMode::Output,
};

/// Discharger enable, driven by the discharge stage, read back here
pub const DISCHARGE_ENABLE: PinDef = PinDef {
    port: Port::A,
    pin: 4,
    mode: PinMode::Output,
};

/// SMPS enable, driven by the charge stage, read back here
pub const SMPS_ENABLE: PinDef = PinDef {
    port: Port::B,
    pin: 10,
    mode: PinMode::Output,
};

/// Balancer idle signal, high while no cell is being bled
pub const BALANCER_IDLE: PinDef = PinDef {
    port: Port::B,
    pin: 11,
    mode: PinMode::Input,
};

/// Analog inputs, one per ADC1 channel in the sequence
pub const ANALOG: [PinDef; 14] = [
    PinDef { port: Port::A, pin: 0, mode: PinMode::Analog },  // Vout
    PinDef { port: Port::A, pin: 1, mode: PinMode::Analog },  // VreversePolarity
    PinDef { port: Port::A, pin: 2, mode: PinMode::Analog },  // Ismps
    PinDef { port: Port::A, pin: 3, mode: PinMode::Analog },  // Idischarge
    PinDef { port: Port::B, pin: 14, mode: PinMode::Analog }, // Vin
    PinDef { port: Port::B, pin: 12, mode: PinMode::Analog }, // Tintern
    PinDef { port: Port::B, pin: 1, mode: PinMode::Analog },  // Textern
    PinDef { port: Port::B, pin: 0, mode: PinMode::Analog },  // Vb0Pin
    PinDef { port: Port::C, pin: 0, mode: PinMode::Analog },  // Vb1Pin
    PinDef { port: Port::C, pin: 1, mode: PinMode::Analog },  // Vb2Pin
    PinDef { port: Port::C, pin: 2, mode: PinMode::Analog },  // Vb3Pin
    PinDef { port: Port::C, pin: 3, mode: PinMode::Analog },  // Vb4Pin
    PinDef { port: Port::B, pin: 15, mode: PinMode::Analog }, // Vb5Pin
    PinDef { port: Port::C, pin: 5, mode: PinMode::Analog },  // Vb6Pin
];
