use log::{debug, info, warn};
use thiserror::Error;

use super::{AxisMap, DeviceBackend, DeviceError, OutputDevice};
use crate::led_feedback::ButtonEventKind;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error(
        "virtual devices provide {have_buttons} buttons / {have_axes} axes, \
         profile needs {need_buttons} / {need_axes}"
    )]
    InsufficientCapacity {
        need_buttons: usize,
        need_axes: usize,
        have_buttons: usize,
        have_axes: usize,
    },
    #[error("logical button {0} is beyond the pool capacity")]
    ButtonOutOfRange(usize),
    #[error("logical axis {0} is beyond the pool capacity")]
    AxisOutOfRange(usize),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

struct PooledDevice {
    device: Box<dyn OutputDevice>,
    max_buttons: usize,
    axes: AxisMap,
}

impl PooledDevice {
    fn new(device: Box<dyn OutputDevice>) -> Self {
        let capacity = device.capacity();
        Self {
            max_buttons: capacity.max_buttons as usize,
            axes: AxisMap::new(&capacity),
            device,
        }
    }
}

/// Ordered set of acquired devices addressed as one flat joystick.
///
/// Routing uses the acquisition order, so the same probe order always
/// yields the same logical-to-device mapping.
pub struct OutputPool {
    devices: Vec<PooledDevice>,
}

impl OutputPool {
    /// Probe `probe_order` until the acquired devices cover `buttons` and
    /// `axes`. Devices that cannot be acquired, have fewer than
    /// `min_buttons` buttons or fail to reset are skipped.
    pub fn acquire(
        backend: &mut dyn DeviceBackend,
        probe_order: &[u32],
        min_buttons: u32,
        buttons: usize,
        axes: usize,
    ) -> Result<Self, PoolError> {
        let mut pool = Self {
            devices: Vec::new(),
        };

        for &id in probe_order {
            if pool.covers(buttons, axes) {
                break;
            }

            let mut device = match backend.acquire(id) {
                Ok(device) => device,
                Err(err) => {
                    debug!("skipping virtual device {id}: {err}");
                    continue;
                }
            };

            let capacity = device.capacity();
            if capacity.max_buttons < min_buttons {
                debug!(
                    "skipping virtual device {id}: {} buttons, at least {min_buttons} required",
                    capacity.max_buttons
                );
                if let Err(err) = device.release() {
                    debug!("failed to release skipped virtual device {id}: {err}");
                }
                continue;
            }
            if let Err(err) = device.reset() {
                debug!("skipping virtual device {id}: reset failed: {err}");
                if let Err(err) = device.release() {
                    debug!("failed to release skipped virtual device {id}: {err}");
                }
                continue;
            }

            let pooled = PooledDevice::new(device);
            info!(
                "virtual device {id} acquired: buttons/axes {}/{}",
                pooled.max_buttons,
                pooled.axes.len()
            );
            pool.devices.push(pooled);
        }

        if !pool.covers(buttons, axes) {
            return Err(PoolError::InsufficientCapacity {
                need_buttons: buttons,
                need_axes: axes,
                have_buttons: pool.total_buttons(),
                have_axes: pool.total_axes(),
            });
        }

        info!(
            "using {} virtual devices, total buttons/axes: {}/{}",
            pool.devices.len(),
            pool.total_buttons(),
            pool.total_axes()
        );
        Ok(pool)
    }

    fn covers(&self, buttons: usize, axes: usize) -> bool {
        self.total_buttons() >= buttons && self.total_axes() >= axes
    }

    pub fn total_buttons(&self) -> usize {
        self.devices.iter().map(|d| d.max_buttons).sum()
    }

    pub fn total_axes(&self) -> usize {
        self.devices.iter().map(|d| d.axes.len()).sum()
    }

    pub fn device_ids(&self) -> Vec<u32> {
        self.devices.iter().map(|d| d.device.id()).collect()
    }

    /// Position of the device owning logical button `logical`, and the
    /// button's index on that device.
    pub fn route_button(&self, logical: usize) -> Option<(usize, usize)> {
        partition(self.devices.iter().map(|d| d.max_buttons), logical)
    }

    /// Position of the device owning logical axis `logical`, and the index
    /// of that axis among the device's enabled axes.
    pub fn route_axis(&self, logical: usize) -> Option<(usize, usize)> {
        partition(self.devices.iter().map(|d| d.axes.len()), logical)
    }

    /// Set a logical button from a raw CC value.
    pub fn set_button(&mut self, logical: usize, value: u8) -> Result<(), PoolError> {
        let (position, local) = self
            .route_button(logical)
            .ok_or(PoolError::ButtonOutOfRange(logical))?;
        let pressed = ButtonEventKind::from_value(value).is_pressed();
        self.devices[position]
            .device
            .set_button(local as u32, pressed)?;
        Ok(())
    }

    /// Set a logical axis from a raw 0-127 CC value.
    pub fn set_axis(&mut self, logical: usize, value: u8) -> Result<(), PoolError> {
        let (position, local) = self
            .route_axis(logical)
            .ok_or(PoolError::AxisOutOfRange(logical))?;
        let pooled = &mut self.devices[position];
        let (slot, scaled) = pooled
            .axes
            .scale(local, value)
            .ok_or(PoolError::AxisOutOfRange(logical))?;
        pooled.device.set_axis(slot, scaled)?;
        Ok(())
    }

    /// Reset and release every device. Safe to call more than once.
    pub fn release_all(&mut self) {
        for pooled in self.devices.drain(..) {
            let mut device = pooled.device;
            let id = device.id();
            if let Err(err) = device.reset() {
                warn!("failed to reset virtual device {id}: {err}");
            }
            match device.release() {
                Ok(()) => debug!("virtual device {id} released"),
                Err(err) => warn!("failed to release virtual device {id}: {err}"),
            }
        }
    }
}

impl Drop for OutputPool {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn partition(capacities: impl Iterator<Item = usize>, mut logical: usize) -> Option<(usize, usize)> {
    for (position, capacity) in capacities.enumerate() {
        if logical < capacity {
            return Some((position, logical));
        }
        logical -= capacity;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{FaultyBackend, SimulatedBackend, VirtualDeviceConfig};

    const FULL: Option<u32> = Some(0x7FFF);

    fn backend(devices: Vec<VirtualDeviceConfig>) -> SimulatedBackend {
        SimulatedBackend::new(devices)
    }

    fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<u32> {
        range.collect()
    }

    #[test]
    fn partitions_buttons_across_devices() {
        let mut backend = backend(vec![
            VirtualDeviceConfig::new(1, 8, vec![]),
            VirtualDeviceConfig::new(2, 8, vec![]),
        ]);
        let pool = OutputPool::acquire(&mut backend, &ids(1..=16), 8, 16, 0).unwrap();

        assert_eq!(pool.route_button(10), Some((1, 2)));
        assert_eq!(pool.route_button(7), Some((0, 7)));
        assert_eq!(pool.route_button(8), Some((1, 0)));
        assert_eq!(pool.route_button(16), None);
    }

    #[test]
    fn set_button_lands_on_local_index() {
        let mut backend = backend(vec![
            VirtualDeviceConfig::new(1, 8, vec![]),
            VirtualDeviceConfig::new(2, 8, vec![]),
        ]);
        let second = backend.state(2).unwrap();
        let mut pool = OutputPool::acquire(&mut backend, &ids(1..=16), 8, 16, 0).unwrap();

        pool.set_button(10, 127).unwrap();
        assert!(second.lock().button(3));
        pool.set_button(10, 0x3F).unwrap();
        assert!(!second.lock().button(3));
    }

    #[test]
    fn axes_skip_disabled_slots_and_scale() {
        let mut backend = backend(vec![
            VirtualDeviceConfig::new(1, 8, vec![FULL, None, FULL]),
            VirtualDeviceConfig::new(2, 8, vec![None, Some(0xFF)]),
        ]);
        let first = backend.state(1).unwrap();
        let second = backend.state(2).unwrap();
        let mut pool = OutputPool::acquire(&mut backend, &ids(1..=16), 8, 0, 3).unwrap();

        assert_eq!(pool.total_axes(), 3);
        pool.set_axis(1, 64).unwrap();
        assert_eq!(first.lock().axis(2), Some(16384));
        pool.set_axis(2, 64).unwrap();
        assert_eq!(second.lock().axis(1), Some(128));
        assert!(matches!(
            pool.set_axis(3, 64),
            Err(PoolError::AxisOutOfRange(3))
        ));
    }

    #[test]
    fn stops_once_demand_is_met() {
        let mut backend = backend(vec![
            VirtualDeviceConfig::new(1, 32, vec![FULL; 8]),
            VirtualDeviceConfig::new(2, 32, vec![FULL; 8]),
            VirtualDeviceConfig::new(3, 32, vec![FULL; 8]),
        ]);
        let pool = OutputPool::acquire(&mut backend, &ids(1..=16), 8, 33, 16).unwrap();
        assert_eq!(pool.device_ids(), vec![1, 2]);
        assert!(!backend.state(3).unwrap().lock().acquired);
    }

    #[test]
    fn skips_busy_and_undersized_devices() {
        let mut backend = backend(vec![
            VirtualDeviceConfig::new(1, 32, vec![]).busy(),
            VirtualDeviceConfig::new(2, 4, vec![]),
            VirtualDeviceConfig::new(5, 32, vec![]),
        ]);
        let pool = OutputPool::acquire(&mut backend, &ids(1..=16), 8, 20, 0).unwrap();

        assert_eq!(pool.device_ids(), vec![5]);
        assert!(!backend.state(2).unwrap().lock().acquired);
    }

    #[test]
    fn skips_device_whose_reset_and_release_fail() {
        let simulated = backend(vec![
            VirtualDeviceConfig::new(1, 32, vec![FULL]),
            VirtualDeviceConfig::new(2, 32, vec![FULL]),
        ]);
        let first = simulated.state(1).unwrap();
        let mut backend = FaultyBackend::new(simulated).failing_teardown(1);

        let pool = OutputPool::acquire(&mut backend, &ids(1..=16), 8, 16, 1).unwrap();
        assert_eq!(pool.device_ids(), vec![2]);
        assert!(!first.lock().acquired);
    }

    #[test]
    fn probe_order_decides_routing() {
        let mut backend = backend(vec![
            VirtualDeviceConfig::new(1, 8, vec![]),
            VirtualDeviceConfig::new(2, 16, vec![]),
        ]);
        let pool = OutputPool::acquire(&mut backend, &[2, 1], 8, 24, 0).unwrap();

        assert_eq!(pool.device_ids(), vec![2, 1]);
        assert_eq!(pool.route_button(10), Some((0, 10)));
        assert_eq!(pool.route_button(16), Some((1, 0)));
    }

    #[test]
    fn fails_and_releases_when_capacity_is_short() {
        let mut backend = backend(vec![
            VirtualDeviceConfig::new(1, 8, vec![]),
            VirtualDeviceConfig::new(2, 8, vec![]),
        ]);
        let err = OutputPool::acquire(&mut backend, &ids(1..=16), 8, 17, 0).err();

        assert!(matches!(
            err,
            Some(PoolError::InsufficientCapacity {
                need_buttons: 17,
                have_buttons: 16,
                ..
            })
        ));
        assert!(!backend.state(1).unwrap().lock().acquired);
        assert!(!backend.state(2).unwrap().lock().acquired);
    }

    #[test]
    fn release_all_frees_devices() {
        let mut backend = backend(vec![VirtualDeviceConfig::new(1, 8, vec![FULL])]);
        let state = backend.state(1).unwrap();
        let mut pool = OutputPool::acquire(&mut backend, &ids(1..=16), 8, 8, 1).unwrap();
        pool.set_button(0, 127).unwrap();
        assert!(state.lock().acquired);

        pool.release_all();
        assert!(!state.lock().acquired);
        assert!(!state.lock().button(1));
        assert_eq!(pool.total_buttons(), 0);
        pool.release_all();
    }
}
