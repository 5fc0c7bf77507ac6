use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{LedConfig, CC_STATUS, LED_OFF, LED_ON};

const CC_MAX: u8 = 127;

/// A contiguous block of CC numbers mapped to buttons or axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "led", default)]
    pub led_config: LedConfig,
    #[serde(rename = "axis", default)]
    pub is_axis: bool,
    pub start: u8,
    pub end: u8,
}

impl CcRange {
    #[allow(dead_code)]
    pub fn buttons(led_config: impl Into<LedConfig>, start: u8, end: u8) -> Self {
        Self {
            name: None,
            led_config: led_config.into(),
            is_axis: false,
            start,
            end,
        }
    }

    #[allow(dead_code)]
    pub fn axes(start: u8, end: u8) -> Self {
        Self {
            name: None,
            led_config: LedConfig::default(),
            is_axis: true,
            start,
            end,
        }
    }

    #[allow(dead_code)]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Number of logical controls covered by the range.
    pub fn width(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn contains(&self, cc: u8) -> bool {
        (self.start..=self.end).contains(&cc)
    }

    fn overlaps(&self, other: &CcRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Ordered list of ranges. Order assigns logical indices.
pub type DeviceProfile = Vec<CcRange>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("range #{index} is empty or reversed ({start}..={end})")]
    Reversed { index: usize, start: u8, end: u8 },
    #[error("range #{index} ends at CC {end}, beyond 127")]
    OutOfBounds { index: usize, end: u8 },
    #[error("range #{first} overlaps range #{second}")]
    Overlap { first: usize, second: usize },
}

/// What a CC number addresses in the logical index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Button(usize),
    Axis(usize),
}

/// A CC resolved against the range table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub range: usize,
    pub control: Control,
    pub led_config: LedConfig,
}

/// Validated profile plus everything derived from it at startup.
#[derive(Debug, Clone)]
pub struct CcRangeTable {
    ranges: Vec<CcRange>,
    total_buttons: usize,
    total_axes: usize,
    leds_on: Vec<[u8; 3]>,
    leds_off: Vec<[u8; 3]>,
}

impl CcRangeTable {
    pub fn new(profile: DeviceProfile) -> Result<Self, ProfileError> {
        for (index, range) in profile.iter().enumerate() {
            if range.start > range.end {
                return Err(ProfileError::Reversed {
                    index,
                    start: range.start,
                    end: range.end,
                });
            }
            if range.end > CC_MAX {
                return Err(ProfileError::OutOfBounds {
                    index,
                    end: range.end,
                });
            }
        }
        for (first, a) in profile.iter().enumerate() {
            if let Some(second) = profile
                .iter()
                .enumerate()
                .skip(first + 1)
                .find(|(_, b)| a.overlaps(b))
                .map(|(i, _)| i)
            {
                return Err(ProfileError::Overlap { first, second });
            }
        }

        let mut total_buttons = 0;
        let mut total_axes = 0;
        let mut leds_on = Vec::new();
        let mut leds_off = Vec::new();
        for range in &profile {
            if range.is_axis {
                total_axes += range.width();
            } else {
                total_buttons += range.width();
            }
            if !range.led_config.has_led() {
                continue;
            }
            for cc in range.start..=range.end {
                leds_on.push([CC_STATUS, cc, LED_ON]);
                leds_off.push([CC_STATUS, cc, LED_OFF]);
            }
        }

        Ok(Self {
            ranges: profile,
            total_buttons,
            total_axes,
            leds_on,
            leds_off,
        })
    }

    /// Resolve a CC number to its logical control.
    ///
    /// Every range passed over advances the base of its own type, matched or
    /// not, so button and axis spaces stay independent however the ranges are
    /// interleaved.
    pub fn resolve(&self, cc: u8) -> Option<Resolved> {
        let mut button_base = 0;
        let mut axis_base = 0;
        for (index, range) in self.ranges.iter().enumerate() {
            if range.contains(cc) {
                let offset = usize::from(cc - range.start);
                let control = if range.is_axis {
                    Control::Axis(axis_base + offset)
                } else {
                    Control::Button(button_base + offset)
                };
                return Some(Resolved {
                    range: index,
                    control,
                    led_config: range.led_config,
                });
            }
            if range.is_axis {
                axis_base += range.width();
            } else {
                button_base += range.width();
            }
        }
        None
    }

    pub fn ranges(&self) -> &[CcRange] {
        &self.ranges
    }

    pub fn total_buttons(&self) -> usize {
        self.total_buttons
    }

    pub fn total_axes(&self) -> usize {
        self.total_axes
    }

    /// One "LED on" message per CC of every range with a drivable LED.
    pub fn leds_on(&self) -> &[[u8; 3]] {
        &self.leds_on
    }

    pub fn leds_off(&self) -> &[[u8; 3]] {
        &self.leds_off
    }
}
