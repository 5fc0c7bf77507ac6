mod cc_range;
mod led;

#[allow(unused_imports)]
pub use cc_range::{CcRange, CcRangeTable, Control, DeviceProfile, ProfileError, Resolved};
#[allow(unused_imports)]
pub use led::{LedConfig, LedOverride, LedOverrides, LedPattern, NoOverrides};

/// Status byte for Control Change on channel 0.
pub const CC_STATUS: u8 = 0xB0;
pub const LED_ON: u8 = 127;
pub const LED_OFF: u8 = 0;
