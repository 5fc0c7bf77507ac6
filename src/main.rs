mod bridge;
mod config;
mod led_feedback;
mod midi_io;
mod output;
mod profile;
mod router;

use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::mpsc::{self, Sender},
    thread,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use bridge::Bridge;
use config::Config;
use output::SimulatedBackend;

/// Route MIDI control changes from a controller to virtual joysticks.
#[derive(Parser, Debug)]
#[command(name = "midi2joy", version, about)]
struct Args {
    /// YAML config file; the built-in nanoKONTROL2 profile is used otherwise
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Input port name hint, overriding the config
    #[arg(long, value_name = "HINT")]
    input: Option<String>,

    /// Output port name hint, overriding the config
    #[arg(long, value_name = "HINT")]
    output: Option<String>,

    /// List MIDI ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Flash every controller LED before routing starts
    #[arg(long)]
    led_check: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("failed to load config")?;

    if args.list_ports {
        midi_io::list_ports(&config.midi.client_name)?;
        return Ok(());
    }

    if let Some(input) = args.input {
        config.midi.input = input;
    }
    if let Some(output) = args.output {
        config.midi.output = output;
    }

    let (quit_tx, quit_rx) = mpsc::channel();
    let signal_tx = quit_tx.clone();
    ctrlc::set_handler(move || {
        let _ = signal_tx.send(());
    })
    .context("failed to install Ctrl-C handler")?;
    thread::spawn(move || forward_enter(io::stdin().lock(), &quit_tx));

    let mut backend = SimulatedBackend::new(config.devices.virtual_devices.clone());
    let bridge = Bridge::start(&config, &mut backend, args.led_check)?;

    info!("press Ctrl-C or Enter to quit");
    quit_rx.recv().context("quit channel closed")?;
    info!("shutting down");

    drop(bridge);
    Ok(())
}

/// Request a quit for every line read from `reader`. End of input is not a
/// request, so a closed or redirected stdin leaves the session running.
fn forward_enter<R: BufRead>(mut reader: R, quit: &Sender<()>) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                debug!("stdin closed, Enter no longer quits");
                return;
            }
            Ok(_) => {
                if quit.send(()).is_err() {
                    return;
                }
            }
            Err(err) => {
                debug!("stopped reading stdin: {err}");
                return;
            }
        }
    }
}
