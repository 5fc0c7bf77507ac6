//! Control Change routing.
//!
//! Every inbound MIDI message passes through [`CcRouter::handle_message`],
//! which owns all runtime state: button and axis values, the LED feedback
//! state machine and the output pool.

use std::sync::Arc;

use log::{trace, warn};

use crate::led_feedback::{ButtonEventKind, ButtonState, LedFeedback};
use crate::midi_io::LedSink;
use crate::output::{OutputPool, PoolError};
use crate::profile::{CcRangeTable, Control, LedOverride, CC_STATUS};

pub struct CcRouter<S: LedSink> {
    table: Arc<CcRangeTable>,
    overrides: Box<dyn LedOverride>,
    feedback: LedFeedback,
    axes: Vec<u8>,
    pool: OutputPool,
    sink: S,
    running: bool,
}

impl<S: LedSink> CcRouter<S> {
    /// Build a router over `pool`, which must cover every logical button and
    /// axis of `table`.
    pub fn new(
        table: Arc<CcRangeTable>,
        pool: OutputPool,
        sink: S,
        overrides: Box<dyn LedOverride>,
    ) -> Result<Self, PoolError> {
        if pool.total_buttons() < table.total_buttons() || pool.total_axes() < table.total_axes()
        {
            return Err(PoolError::InsufficientCapacity {
                need_buttons: table.total_buttons(),
                need_axes: table.total_axes(),
                have_buttons: pool.total_buttons(),
                have_axes: pool.total_axes(),
            });
        }

        Ok(Self {
            feedback: LedFeedback::new(table.total_buttons()),
            axes: vec![0; table.total_axes()],
            table,
            overrides,
            pool,
            sink,
            running: true,
        })
    }

    /// Route one raw MIDI message. Anything other than a Control Change on
    /// channel 0 with valid data bytes is ignored.
    pub fn handle_message(&mut self, message: &[u8]) {
        if !self.running {
            return;
        }
        trace!("midi in: {}", hexify(message));

        let &[status, cc, value] = message else {
            return;
        };
        if status != CC_STATUS || cc > 0x7F || value > 0x7F {
            return;
        }
        let Some(resolved) = self.table.resolve(cc) else {
            return;
        };

        match resolved.control {
            Control::Axis(index) => {
                if let Some(slot) = self.axes.get_mut(index) {
                    *slot = value;
                }
                if let Err(err) = self.pool.set_axis(index, value) {
                    warn!(
                        "dropped axis {index} update from {}: {err}",
                        self.range_label(resolved.range)
                    );
                }
            }
            Control::Button(index) => {
                let kind = ButtonEventKind::from_value(value);
                if let Err(err) = self.pool.set_button(index, value) {
                    warn!(
                        "dropped button {index} update from {}: {err}",
                        self.range_label(resolved.range)
                    );
                }
                let led = self
                    .overrides
                    .led_config(cc)
                    .unwrap_or(resolved.led_config);
                if let Some(command) = self.feedback.transition(index, kind, led.pattern) {
                    self.send(&command.to_message(cc));
                }
            }
        }
    }

    /// Switch off every drivable LED.
    pub fn reset_leds(&mut self) {
        let table = Arc::clone(&self.table);
        for message in table.leds_off() {
            self.send(message);
        }
    }

    /// Switch on every drivable LED.
    pub fn light_leds(&mut self) {
        let table = Arc::clone(&self.table);
        for message in table.leds_on() {
            self.send(message);
        }
    }

    /// Switch the LEDs off, release the output devices and close the LED
    /// output, in that order. Later messages are ignored.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.reset_leds();
        self.running = false;
        self.pool.release_all();
        self.sink.close();
    }

    #[allow(dead_code)]
    pub fn button(&self, index: usize) -> Option<&ButtonState> {
        self.feedback.button(index)
    }

    #[allow(dead_code)]
    pub fn axis(&self, index: usize) -> Option<u8> {
        self.axes.get(index).copied()
    }

    pub fn pool(&self) -> &OutputPool {
        &self.pool
    }

    fn range_label(&self, range: usize) -> String {
        match self.table.ranges().get(range).and_then(|r| r.name.as_deref()) {
            Some(name) => format!("range \"{name}\""),
            None => format!("range #{range}"),
        }
    }

    fn send(&mut self, message: &[u8]) {
        if let Err(err) = self.sink.send(message) {
            warn!("failed to send LED message {}: {err}", hexify(message));
        }
    }
}

fn hexify(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
