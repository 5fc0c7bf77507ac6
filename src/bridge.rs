use std::{sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use log::{debug, info};
use midir::MidiInputConnection;
use parking_lot::Mutex;

use crate::config::Config;
use crate::midi_io::{connect_input, MidiOutSink};
use crate::output::{DeviceBackend, OutputPool};
use crate::router::CcRouter;

const LED_CHECK_DURATION_MS: u64 = 500;

/// A running controller-to-joystick session.
///
/// Dropping the bridge switches the controller LEDs off, releases every
/// virtual device and closes both MIDI ports, in that order. This also runs
/// while unwinding from a panic.
pub struct Bridge {
    input: Option<MidiInputConnection<()>>,
    router: Arc<Mutex<CcRouter<MidiOutSink>>>,
}

impl Bridge {
    pub fn start(config: &Config, backend: &mut dyn DeviceBackend, led_check: bool) -> Result<Self> {
        let table = Arc::new(config.profile.table().context("invalid profile")?);
        info!(
            "profile maps {} buttons and {} axes",
            table.total_buttons(),
            table.total_axes()
        );
        for range in table.ranges() {
            debug!(
                "{} CC {}-{} as {} ({:?} LED)",
                range.name.as_deref().unwrap_or("unnamed"),
                range.start,
                range.end,
                if range.is_axis { "axes" } else { "buttons" },
                range.led_config.pattern
            );
        }

        let pool = OutputPool::acquire(
            backend,
            &config.devices.probe_order,
            config.devices.min_buttons,
            table.total_buttons(),
            table.total_axes(),
        )
        .context("failed to acquire virtual joysticks")?;

        let sink = MidiOutSink::open(&config.midi.client_name, &config.midi.output)
            .context("failed to open controller output")?;
        let feedback_port = sink.port_name().to_owned();

        let mut router = CcRouter::new(
            table,
            pool,
            sink,
            Box::new(config.profile.led_overrides.clone()),
        )?;

        if led_check {
            router.light_leds();
            thread::sleep(Duration::from_millis(LED_CHECK_DURATION_MS));
        }
        router.reset_leds();

        let router = Arc::new(Mutex::new(router));
        let handler = Arc::clone(&router);
        let (input, port_name) = connect_input(
            &config.midi.client_name,
            &config.midi.input,
            move |message| handler.lock().handle_message(message),
        )
        .context("failed to open controller input")?;

        let device_ids = router.lock().pool().device_ids();
        info!(
            "routing \"{port_name}\" to virtual devices {device_ids:?}, LED feedback on \"{feedback_port}\""
        );

        Ok(Self {
            input: Some(input),
            router,
        })
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.router.lock().shutdown();
        if let Some(input) = self.input.take() {
            let _ = input.close();
            info!("closed MIDI input");
        }
    }
}
