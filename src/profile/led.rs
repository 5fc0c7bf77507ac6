use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// LED behaviour attached to a group of controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedPattern {
    /// The controls have no LED the host can drive.
    #[default]
    Unavailable,
    Undefined,
    Disabled,
    /// LED mirrors the physical press.
    Momentary,
    /// LED follows a flip-flop advanced on every press.
    Toggle,
    Blink,
    Breath,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedConfig {
    pub pattern: LedPattern,
    /// Reserved for the time based patterns (`Blink`, `Breath`).
    #[serde(default)]
    pub period_ms: u16,
}

impl LedConfig {
    pub const fn new(pattern: LedPattern) -> Self {
        Self {
            pattern,
            period_ms: 0,
        }
    }

    pub fn has_led(&self) -> bool {
        self.pattern != LedPattern::Unavailable
    }
}

impl From<LedPattern> for LedConfig {
    fn from(pattern: LedPattern) -> Self {
        Self::new(pattern)
    }
}

/// Per-CC LED behaviour that takes precedence over the range default.
pub trait LedOverride: Send {
    fn led_config(&self, cc: u8) -> Option<LedConfig>;
}

/// Override policy that never overrides anything.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

impl LedOverride for NoOverrides {
    fn led_config(&self, _cc: u8) -> Option<LedConfig> {
        None
    }
}

/// Overrides keyed by CC number, as loaded from the config file.
pub type LedOverrides = BTreeMap<u8, LedConfig>;

impl LedOverride for LedOverrides {
    fn led_config(&self, cc: u8) -> Option<LedConfig> {
        self.get(&cc).copied()
    }
}
