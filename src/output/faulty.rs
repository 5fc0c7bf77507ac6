//! Simulated backend with injectable device failures.

use super::{DeviceBackend, DeviceCapacity, DeviceError, OutputDevice, SimulatedBackend};

pub struct FaultyBackend {
    inner: SimulatedBackend,
    failing_writes: Vec<u32>,
    failing_teardown: Vec<u32>,
}

impl FaultyBackend {
    pub fn new(inner: SimulatedBackend) -> Self {
        Self {
            inner,
            failing_writes: Vec::new(),
            failing_teardown: Vec::new(),
        }
    }

    /// Device `id` rejects every button and axis update.
    pub fn failing_writes(mut self, id: u32) -> Self {
        self.failing_writes.push(id);
        self
    }

    /// Device `id` reports an error from `reset` and `release`. The release
    /// still frees the simulated device.
    pub fn failing_teardown(mut self, id: u32) -> Self {
        self.failing_teardown.push(id);
        self
    }
}

impl DeviceBackend for FaultyBackend {
    fn acquire(&mut self, id: u32) -> Result<Box<dyn OutputDevice>, DeviceError> {
        let inner = self.inner.acquire(id)?;
        Ok(Box::new(FaultyJoystick {
            inner,
            fail_writes: self.failing_writes.contains(&id),
            fail_teardown: self.failing_teardown.contains(&id),
        }))
    }
}

struct FaultyJoystick {
    inner: Box<dyn OutputDevice>,
    fail_writes: bool,
    fail_teardown: bool,
}

impl FaultyJoystick {
    fn fault(&self, what: &str) -> DeviceError {
        DeviceError::Write {
            id: self.inner.id(),
            reason: format!("{what} failed"),
        }
    }
}

impl OutputDevice for FaultyJoystick {
    fn id(&self) -> u32 {
        self.inner.id()
    }

    fn capacity(&self) -> DeviceCapacity {
        self.inner.capacity()
    }

    fn set_button(&mut self, local: u32, pressed: bool) -> Result<(), DeviceError> {
        if self.fail_writes {
            return Err(self.fault("button write"));
        }
        self.inner.set_button(local, pressed)
    }

    fn set_axis(&mut self, slot: usize, value: u32) -> Result<(), DeviceError> {
        if self.fail_writes {
            return Err(self.fault("axis write"));
        }
        self.inner.set_axis(slot, value)
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        if self.fail_teardown {
            return Err(self.fault("reset"));
        }
        self.inner.reset()
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        self.inner.release()?;
        if self.fail_teardown {
            return Err(self.fault("release"));
        }
        Ok(())
    }
}
