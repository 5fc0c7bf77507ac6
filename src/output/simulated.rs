use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{DeviceBackend, DeviceCapacity, DeviceError, OutputDevice};

/// X, Y, Z, Rx, Ry, Rz, Slider0, Slider1.
const MAX_AXIS_SLOTS: usize = 8;

/// A virtual joystick declared in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualDeviceConfig {
    pub id: u32,
    pub buttons: u32,
    /// Native maximum of each raw axis slot, `null` for a missing slot.
    #[serde(default)]
    pub axes: Vec<Option<u32>>,
    /// Pretend another feeder owns the device.
    #[serde(default)]
    pub busy: bool,
}

impl VirtualDeviceConfig {
    #[allow(dead_code)]
    pub fn new(id: u32, buttons: u32, axes: Vec<Option<u32>>) -> Self {
        Self {
            id,
            buttons,
            axes,
            busy: false,
        }
    }

    #[allow(dead_code)]
    pub fn busy(mut self) -> Self {
        self.busy = true;
        self
    }
}

/// Observable state of one simulated joystick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoystickState {
    pub acquired: bool,
    buttons: Vec<bool>,
    axes: Vec<Option<u32>>,
}

impl JoystickState {
    fn clear(&mut self) {
        self.buttons.iter_mut().for_each(|b| *b = false);
        self.axes.iter_mut().for_each(|a| *a = None);
    }

    /// Button state by native (1-based) number.
    #[allow(dead_code)]
    pub fn button(&self, number: u32) -> bool {
        number
            .checked_sub(1)
            .and_then(|i| self.buttons.get(i as usize))
            .copied()
            .unwrap_or(false)
    }

    /// Last value written to a raw axis slot.
    #[allow(dead_code)]
    pub fn axis(&self, slot: usize) -> Option<u32> {
        self.axes.get(slot).copied().flatten()
    }
}

/// Backend serving the virtual joysticks listed in the config.
pub struct SimulatedBackend {
    devices: Vec<(VirtualDeviceConfig, Arc<Mutex<JoystickState>>)>,
}

impl SimulatedBackend {
    pub fn new(devices: Vec<VirtualDeviceConfig>) -> Self {
        let devices = devices
            .into_iter()
            .map(|config| {
                let state = JoystickState {
                    acquired: false,
                    buttons: vec![false; config.buttons as usize],
                    axes: vec![None; config.axes.len()],
                };
                (config, Arc::new(Mutex::new(state)))
            })
            .collect();
        Self { devices }
    }

    /// Shared handle on the state of device `id`.
    #[allow(dead_code)]
    pub fn state(&self, id: u32) -> Option<Arc<Mutex<JoystickState>>> {
        self.devices
            .iter()
            .find(|(config, _)| config.id == id)
            .map(|(_, state)| Arc::clone(state))
    }
}

impl DeviceBackend for SimulatedBackend {
    fn acquire(&mut self, id: u32) -> Result<Box<dyn OutputDevice>, DeviceError> {
        let (config, state) = self
            .devices
            .iter()
            .find(|(config, _)| config.id == id)
            .ok_or(DeviceError::NotFound(id))?;

        if config.axes.len() > MAX_AXIS_SLOTS {
            return Err(DeviceError::Unsupported {
                id,
                reason: format!(
                    "{} axis slots, at most {MAX_AXIS_SLOTS} supported",
                    config.axes.len()
                ),
            });
        }

        let mut guard = state.lock();
        if config.busy || guard.acquired {
            return Err(DeviceError::Busy(id));
        }
        guard.acquired = true;

        Ok(Box::new(SimulatedJoystick {
            id,
            capacity: DeviceCapacity::new(config.buttons, config.axes.clone()),
            state: Arc::clone(state),
        }))
    }
}

pub struct SimulatedJoystick {
    id: u32,
    capacity: DeviceCapacity,
    state: Arc<Mutex<JoystickState>>,
}

impl SimulatedJoystick {
    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut JoystickState) -> Result<T, DeviceError>,
    ) -> Result<T, DeviceError> {
        let mut state = self.state.lock();
        if !state.acquired {
            return Err(DeviceError::Released(self.id));
        }
        f(&mut state)
    }
}

impl OutputDevice for SimulatedJoystick {
    fn id(&self) -> u32 {
        self.id
    }

    fn capacity(&self) -> DeviceCapacity {
        self.capacity.clone()
    }

    fn set_button(&mut self, local: u32, pressed: bool) -> Result<(), DeviceError> {
        let id = self.id;
        self.with_state(|state| {
            let slot = state
                .buttons
                .get_mut(local as usize)
                .ok_or_else(|| DeviceError::Write {
                    id,
                    reason: format!("no button {}", local + 1),
                })?;
            *slot = pressed;
            debug!(
                "joystick {id}: button {} {}",
                local + 1,
                if pressed { "down" } else { "up" }
            );
            Ok(())
        })
    }

    fn set_axis(&mut self, slot: usize, value: u32) -> Result<(), DeviceError> {
        let id = self.id;
        let max = self.capacity.axes.get(slot).copied().flatten();
        self.with_state(|state| match (max, state.axes.get_mut(slot)) {
            (Some(max), Some(axis)) if value <= max => {
                *axis = Some(value);
                debug!("joystick {id}: axis {slot} = {value}");
                Ok(())
            }
            _ => Err(DeviceError::Write {
                id,
                reason: format!("axis slot {slot} cannot take {value}"),
            }),
        })
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        self.with_state(|state| {
            state.clear();
            Ok(())
        })
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        self.with_state(|state| {
            state.clear();
            state.acquired = false;
            Ok(())
        })
    }
}
