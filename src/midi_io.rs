use log::info;
use midir::{Ignore, MidiIO, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to initialise MIDI {0}")]
    MidiInit(String),
    #[error("no MIDI {0} port available")]
    NoPort(&'static str),
    #[error("no MIDI {direction} port matching \"{hint}\" was found")]
    PortNotFound {
        direction: &'static str,
        hint: String,
    },
    #[error("failed to open MIDI connection: {0}")]
    Connection(String),
    #[error("failed to send MIDI message: {0}")]
    Send(String),
    #[error("MIDI output is closed")]
    Closed,
}

/// Destination for LED feedback messages.
pub trait LedSink: Send {
    fn send(&mut self, message: &[u8]) -> Result<(), TransportError>;
    fn close(&mut self);
}

/// LED feedback written to the controller's MIDI output port.
pub struct MidiOutSink {
    connection: Option<MidiOutputConnection>,
    port_name: String,
}

impl MidiOutSink {
    pub fn open(client_name: &str, port_hint: &str) -> Result<Self, TransportError> {
        let midi_out = MidiOutput::new(client_name)
            .map_err(|err| TransportError::MidiInit(format!("output: {err}")))?;
        let (port, port_name) = select_port(&midi_out, port_hint, "output")?;

        let connection = midi_out
            .connect(&port, &format!("{client_name}-out"))
            .map_err(|err| TransportError::Connection(err.to_string()))?;
        info!("opened MIDI output \"{port_name}\"");

        Ok(Self {
            connection: Some(connection),
            port_name,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl LedSink for MidiOutSink {
    fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        self.connection
            .as_mut()
            .ok_or(TransportError::Closed)?
            .send(message)
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
            info!("closed MIDI output \"{}\"", self.port_name);
        }
    }
}

impl Drop for MidiOutSink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open the controller's input port and deliver every message to `callback`
/// on midir's receive thread.
pub fn connect_input<F>(
    client_name: &str,
    port_hint: &str,
    mut callback: F,
) -> Result<(MidiInputConnection<()>, String), TransportError>
where
    F: FnMut(&[u8]) + Send + 'static,
{
    let mut midi_in = MidiInput::new(client_name)
        .map_err(|err| TransportError::MidiInit(format!("input: {err}")))?;
    midi_in.ignore(Ignore::All);
    let (port, port_name) = select_port(&midi_in, port_hint, "input")?;

    let connection = midi_in
        .connect(
            &port,
            &format!("{client_name}-in"),
            move |_stamp, message, _| callback(message),
            (),
        )
        .map_err(|err| TransportError::Connection(err.to_string()))?;
    info!("opened MIDI input \"{port_name}\"");

    Ok((connection, port_name))
}

/// Print every input and output port.
pub fn list_ports(client_name: &str) -> Result<(), TransportError> {
    let midi_in = MidiInput::new(client_name)
        .map_err(|err| TransportError::MidiInit(format!("input: {err}")))?;
    let midi_out = MidiOutput::new(client_name)
        .map_err(|err| TransportError::MidiInit(format!("output: {err}")))?;

    println!("Inputs:");
    print_ports(&midi_in);
    println!("Outputs:");
    print_ports(&midi_out);
    Ok(())
}

fn print_ports<T: MidiIO>(io: &T) {
    for (index, port) in io.ports().iter().enumerate() {
        let name = io.port_name(port).unwrap_or_else(|_| "<unknown>".into());
        println!("  [{index}] {name}");
    }
}

/// An empty hint picks the most recently enumerated port; otherwise the first
/// port whose name contains the hint, case-insensitively.
fn select_port<T: MidiIO>(
    io: &T,
    hint: &str,
    direction: &'static str,
) -> Result<(T::Port, String), TransportError> {
    let ports = io.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|port| io.port_name(port).unwrap_or_else(|_| "<unknown>".into()))
        .collect();

    let index = match_port(&names, hint).ok_or_else(|| {
        if names.is_empty() {
            TransportError::NoPort(direction)
        } else {
            TransportError::PortNotFound {
                direction,
                hint: hint.to_string(),
            }
        }
    })?;

    Ok((ports[index].clone(), names[index].clone()))
}

fn match_port(names: &[String], hint: &str) -> Option<usize> {
    let hint = hint.trim();
    if hint.is_empty() {
        return names.len().checked_sub(1);
    }
    let hint = hint.to_lowercase();
    names
        .iter()
        .position(|name| name.to_lowercase().contains(&hint))
}

#[cfg(test)]
mod tests {
    use super::match_port;

    fn names() -> Vec<String> {
        vec![
            "Midi Through:Midi Through Port-0 14:0".into(),
            "nanoKONTROL2:nanoKONTROL2 MIDI 1 20:0".into(),
            "X1 Tap Clock 24:0".into(),
        ]
    }

    #[test]
    fn empty_hint_picks_last_port() {
        assert_eq!(match_port(&names(), ""), Some(2));
        assert_eq!(match_port(&names(), "   "), Some(2));
        assert_eq!(match_port(&[], ""), None);
    }

    #[test]
    fn hint_matches_case_insensitively() {
        assert_eq!(match_port(&names(), "NANOkontrol"), Some(1));
        assert_eq!(match_port(&names(), "launchpad"), None);
    }
}
