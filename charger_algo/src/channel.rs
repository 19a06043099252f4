// Channel identifiers for every analog input of the charger.

// Key Features:
// - One contiguous enum covers physical (sampled) and virtual (computed) channels
// - Physical channels occupy the range 0..PHYSICAL_INPUTS, virtual ones follow
// - Each channel carries a quantity kind used for connection thresholds and printing

// Licensed under the Apache License, Version 2.0

/// Number of directly sampled channels (the head of [`Name::ALL`]).
pub const PHYSICAL_INPUTS: usize = 14;

/// Number of channels in the full value table (physical + virtual).
pub const ALL_INPUTS: usize = 32;

/// Number of balancer segments (cells) supported by the hardware.
pub const BALANCE_PORTS: usize = 6;

/// Quantity kind of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Kind {
    Voltage,
    Current,
    Temperature,
    Unknown,
}

/// Analog channel identifier.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Name {
    // ####### Physical inputs ########
    /// Output voltage sense (direct, before the balancer cross-check)
    Vout = 0,
    /// Reverse polarity sense
    VreversePolarity,
    /// Charging stage (SMPS) current
    Ismps,
    /// Discharging stage current
    Idischarge,
    /// Supply input voltage
    Vin,
    /// Internal (heatsink) temperature
    Tintern,
    /// External (battery) temperature probe
    Textern,
    /// Balancer tap 0 (pack negative, used by the simplified wiring)
    Vb0Pin,
    Vb1Pin,
    Vb2Pin,
    Vb3Pin,
    Vb4Pin,
    Vb5Pin,
    Vb6Pin,

    // ####### Virtual inputs ########
    /// Selected output voltage (balancer sum or direct reading)
    VoutBalancer,
    /// Output current of the active power stage
    Iout,
    /// Accumulated output charge
    Cout,
    /// Output power
    Pout,
    /// Output energy
    Eout,
    /// Sum of connected balancer segments
    Vbalancer,
    /// Connected balancer port count
    VbalanceInfo,
    /// Index of the channel selected as output voltage source
    VobInfo,
    /// Drop of the output voltage from its maximum over delta windows
    DeltaVout,
    /// Maximum output voltage seen by the delta window
    DeltaVoutMax,
    /// Change of the external temperature between delta windows
    DeltaTextern,
    /// Sample count of the last finished delta window
    DeltaLastCount,
    /// Balancer segment (cell) voltages
    Vb1,
    Vb2,
    Vb3,
    Vb4,
    Vb5,
    Vb6,
}

impl Name {
    /// All channels in index order.
    pub const ALL: [Name; ALL_INPUTS] = [
        Name::Vout,
        Name::VreversePolarity,
        Name::Ismps,
        Name::Idischarge,
        Name::Vin,
        Name::Tintern,
        Name::Textern,
        Name::Vb0Pin,
        Name::Vb1Pin,
        Name::Vb2Pin,
        Name::Vb3Pin,
        Name::Vb4Pin,
        Name::Vb5Pin,
        Name::Vb6Pin,
        Name::VoutBalancer,
        Name::Iout,
        Name::Cout,
        Name::Pout,
        Name::Eout,
        Name::Vbalancer,
        Name::VbalanceInfo,
        Name::VobInfo,
        Name::DeltaVout,
        Name::DeltaVoutMax,
        Name::DeltaTextern,
        Name::DeltaLastCount,
        Name::Vb1,
        Name::Vb2,
        Name::Vb3,
        Name::Vb4,
        Name::Vb5,
        Name::Vb6,
    ];

    /// Balancer tap pins, tap 0 first.
    pub const BALANCER_PINS: [Name; BALANCE_PORTS + 1] = [
        Name::Vb0Pin,
        Name::Vb1Pin,
        Name::Vb2Pin,
        Name::Vb3Pin,
        Name::Vb4Pin,
        Name::Vb5Pin,
        Name::Vb6Pin,
    ];

    /// Balancer segments, cell 1 first.
    pub const BALANCER_SEGMENTS: [Name; BALANCE_PORTS] = [
        Name::Vb1,
        Name::Vb2,
        Name::Vb3,
        Name::Vb4,
        Name::Vb5,
        Name::Vb6,
    ];

    /// Position of the channel in the value table.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Channel at `index`, `None` past the end of the table.
    pub fn from_index(index: usize) -> Option<Name> {
        Self::ALL.get(index).copied()
    }

    /// True for directly sampled channels.
    #[inline(always)]
    pub const fn is_physical(self) -> bool {
        self.index() < PHYSICAL_INPUTS
    }

    /// Iterates the physical channels in index order.
    pub fn physical() -> impl Iterator<Item = Name> {
        Self::ALL[..PHYSICAL_INPUTS].iter().copied()
    }

    /// Iterates the virtual channels in index order.
    pub fn virtuals() -> impl Iterator<Item = Name> {
        Self::ALL[PHYSICAL_INPUTS..].iter().copied()
    }

    /// Iterates every channel in index order.
    pub fn all() -> impl Iterator<Item = Name> {
        Self::ALL.iter().copied()
    }

    /// Quantity kind of the channel.
    pub const fn kind(self) -> Kind {
        match self {
            Name::Ismps | Name::Idischarge | Name::Iout => Kind::Current,
            Name::Tintern | Name::Textern | Name::DeltaTextern => Kind::Temperature,
            Name::Cout
            | Name::Pout
            | Name::Eout
            | Name::VbalanceInfo
            | Name::VobInfo
            | Name::DeltaLastCount => Kind::Unknown,
            _ => Kind::Voltage,
        }
    }
}
