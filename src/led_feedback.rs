//! LED feedback for controller buttons.
//!
//! Tracks press and toggle state per logical button and decides which LED
//! message, if any, a transition produces.

use crate::profile::{LedPattern, CC_STATUS, LED_OFF, LED_ON};

/// Classification for button state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEventKind {
    Pressed,
    Released,
}

impl ButtonEventKind {
    /// Controllers send 0x40 and above for a held button.
    pub fn from_value(value: u8) -> Self {
        if value >= 0x40 {
            ButtonEventKind::Pressed
        } else {
            ButtonEventKind::Released
        }
    }

    pub fn is_pressed(self) -> bool {
        matches!(self, ButtonEventKind::Pressed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
}

impl LedCommand {
    pub fn to_message(self, cc: u8) -> [u8; 3] {
        let value = match self {
            LedCommand::On => LED_ON,
            LedCommand::Off => LED_OFF,
        };
        [CC_STATUS, cc, value]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub pressed: bool,
    /// Only meaningful for buttons driven with `LedPattern::Toggle`.
    pub toggled: bool,
}

#[derive(Debug, Clone)]
pub struct LedFeedback {
    buttons: Vec<ButtonState>,
}

impl LedFeedback {
    pub fn new(button_count: usize) -> Self {
        Self {
            buttons: vec![ButtonState::default(); button_count],
        }
    }

    pub fn button(&self, index: usize) -> Option<&ButtonState> {
        self.buttons.get(index)
    }

    /// Apply a transition to button `index` and return the LED command it
    /// produces under `pattern`.
    ///
    /// Toggle buttons flip on press only. The LED is switched on by the press
    /// that sets the flip-flop and off by the release that follows the press
    /// clearing it, so it never changes in the middle of a press/release pair:
    ///
    /// ```text
    /// press/release   1 0   1 0   1 0   1 0
    /// toggled         1 1   0 0   1 1   0 0
    /// emitted         ON -  - OFF ON -  - OFF
    /// ```
    pub fn transition(
        &mut self,
        index: usize,
        kind: ButtonEventKind,
        pattern: LedPattern,
    ) -> Option<LedCommand> {
        let state = self.buttons.get_mut(index)?;
        let pressed = kind.is_pressed();
        state.pressed = pressed;

        match pattern {
            LedPattern::Momentary => Some(if pressed {
                LedCommand::On
            } else {
                LedCommand::Off
            }),
            LedPattern::Toggle => {
                if pressed {
                    state.toggled = !state.toggled;
                }
                match (pressed, state.toggled) {
                    (true, true) => Some(LedCommand::On),
                    (false, false) => Some(LedCommand::Off),
                    _ => None,
                }
            }
            LedPattern::Unavailable
            | LedPattern::Undefined
            | LedPattern::Disabled
            | LedPattern::Blink
            | LedPattern::Breath => None,
        }
    }
}
