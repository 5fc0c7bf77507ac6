//! Virtual joystick outputs.
//!
//! A backend hands out devices by id; the pool concatenates the capacity of
//! every acquired device into one logical button space and one logical axis
//! space.

#[cfg(test)]
mod faulty;
mod pool;
mod simulated;

use thiserror::Error;

#[cfg(test)]
pub use faulty::FaultyBackend;
pub use pool::{OutputPool, PoolError};
#[allow(unused_imports)]
pub use simulated::{JoystickState, SimulatedBackend, SimulatedJoystick, VirtualDeviceConfig};

/// Largest raw value a CC can carry, plus one.
const CC_SPAN: u32 = 128;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("virtual device {0} does not exist")]
    NotFound(u32),
    #[error("virtual device {0} is owned by another feeder")]
    Busy(u32),
    #[error("virtual device {id} is unsupported: {reason}")]
    Unsupported { id: u32, reason: String },
    #[error("virtual device {id} rejected update: {reason}")]
    Write { id: u32, reason: String },
    #[error("virtual device {0} was already released")]
    Released(u32),
}

/// What an acquired device can represent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCapacity {
    pub max_buttons: u32,
    /// Native maximum per raw axis slot; `None` for slots the device lacks.
    pub axes: Vec<Option<u32>>,
}

impl DeviceCapacity {
    pub fn new(max_buttons: u32, axes: Vec<Option<u32>>) -> Self {
        Self { max_buttons, axes }
    }
}

/// One virtual joystick.
///
/// Indices are zero based; backends translate to their native numbering.
pub trait OutputDevice: Send {
    fn id(&self) -> u32;
    fn capacity(&self) -> DeviceCapacity;
    fn set_button(&mut self, local: u32, pressed: bool) -> Result<(), DeviceError>;
    /// Write an already scaled value to a raw axis slot.
    fn set_axis(&mut self, slot: usize, value: u32) -> Result<(), DeviceError>;
    fn reset(&mut self) -> Result<(), DeviceError>;
    fn release(&mut self) -> Result<(), DeviceError>;
}

/// Source of virtual joysticks, probed by id.
pub trait DeviceBackend {
    fn acquire(&mut self, id: u32) -> Result<Box<dyn OutputDevice>, DeviceError>;
}

/// Enabled axes of one device, in slot order, with their scale factors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisMap {
    slots: Vec<(usize, u32)>,
}

impl AxisMap {
    pub fn new(capacity: &DeviceCapacity) -> Self {
        let slots = capacity
            .axes
            .iter()
            .enumerate()
            .filter_map(|(slot, max)| {
                let factor = max
                    .map(|max| ((u64::from(max) + 1) / u64::from(CC_SPAN)) as u32)
                    .unwrap_or(0);
                (factor > 0).then_some((slot, factor))
            })
            .collect();
        Self { slots }
    }

    /// Number of usable axes.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Map the Nth enabled axis and a 0-127 value onto a raw slot and a
    /// native value.
    pub fn scale(&self, axis: usize, value: u8) -> Option<(usize, u32)> {
        self.slots
            .get(axis)
            .map(|&(slot, factor)| (slot, u32::from(value) * factor))
    }
}
