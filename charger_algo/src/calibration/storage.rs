// Persistent calibration storage seen by the measurement core.

// Key Features:
// - Both anchors of a channel are read and written as one unit
// - Read-only firmware defaults are part of the storage contract
// - `SharedStorage` makes a storage usable from several contexts at once

// Detailed Operation:
// The core only ever asks for the pair of one physical channel. A point
// update is a read-modify-write of that pair, expressed by `modify_points`,
// which `SharedStorage` runs inside a single critical section so a
// concurrent lookup never sees the old p0 next to the new p1.

// Licensed under the Apache License, Version 2.0

use core::cell::RefCell;

use critical_section::Mutex;

use super::defaults::DEFAULT_POINTS;
use super::PointPair;
use crate::channel::{Name, PHYSICAL_INPUTS};

/// Calibration block access. Only physical channels are ever passed in.
pub trait CalibrationStorage {
    /// Current anchors of `name`.
    fn read_points(&self, name: Name) -> PointPair;

    /// Replaces the anchors of `name`.
    fn write_points(&mut self, name: Name, points: &PointPair);

    /// Firmware default anchors of `name`.
    fn default_points(&self, name: Name) -> PointPair {
        DEFAULT_POINTS
            .get(name.index())
            .copied()
            .unwrap_or([super::CalibrationPoint::IDENTITY; 2])
    }

    /// Read-modify-write of one pair; `f` decides by its result whether
    /// the modified pair is stored.
    fn modify_points<R, E>(
        &mut self,
        name: Name,
        f: impl FnOnce(&mut PointPair) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut points = self.read_points(name);
        let result = f(&mut points)?;
        self.write_points(name, &points);
        Ok(result)
    }
}

/// RAM image of the calibration block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationTable {
    points: [PointPair; PHYSICAL_INPUTS],
}

impl CalibrationTable {
    /// Table holding the firmware defaults.
    pub const fn new() -> Self {
        Self {
            points: DEFAULT_POINTS,
        }
    }

    /// Table restored from a previously saved image.
    pub const fn from_points(points: [PointPair; PHYSICAL_INPUTS]) -> Self {
        Self { points }
    }

    /// Image to persist.
    pub fn points(&self) -> &[PointPair; PHYSICAL_INPUTS] {
        &self.points
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationStorage for CalibrationTable {
    fn read_points(&self, name: Name) -> PointPair {
        self.points
            .get(name.index())
            .copied()
            .unwrap_or([super::CalibrationPoint::IDENTITY; 2])
    }

    fn write_points(&mut self, name: Name, points: &PointPair) {
        if let Some(slot) = self.points.get_mut(name.index()) {
            *slot = *points;
        }
    }
}

/// Storage shared between execution contexts.
pub struct SharedStorage<S> {
    inner: Mutex<RefCell<S>>,
}

impl<S> SharedStorage<S> {
    pub const fn new(storage: S) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(storage)),
        }
    }

    /// Runs `f` with exclusive access to the storage.
    pub fn lock<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }
}

impl<S: CalibrationStorage> CalibrationStorage for &SharedStorage<S> {
    fn read_points(&self, name: Name) -> PointPair {
        self.lock(|s| s.read_points(name))
    }

    fn write_points(&mut self, name: Name, points: &PointPair) {
        self.lock(|s| s.write_points(name, points))
    }

    fn default_points(&self, name: Name) -> PointPair {
        self.lock(|s| s.default_points(name))
    }

    fn modify_points<R, E>(
        &mut self,
        name: Name,
        f: impl FnOnce(&mut PointPair) -> Result<R, E>,
    ) -> Result<R, E> {
        self.lock(|s| s.modify_points(name, f))
    }
}
