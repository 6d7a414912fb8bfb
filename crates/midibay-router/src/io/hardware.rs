//! midir port adapter.

use crate::endpoint::{Direction, EndpointId, OutputSink};
use crate::system::MidiRouter;
use crate::{Error, Result};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiDeviceInfo {
    pub index: usize,
    pub name: String,
    pub direction: Direction,
}

/// Lists hardware ports by index and name. Indices are only valid until the
/// next device change.
pub fn list_midir_ports() -> Vec<MidiDeviceInfo> {
    let mut devices = Vec::new();
    if let Ok(midi_input) = MidiInput::new("midibay-device-list") {
        for (index, port) in midi_input.ports().iter().enumerate() {
            let name = midi_input
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Input {}", index));
            devices.push(MidiDeviceInfo {
                index,
                name,
                direction: Direction::Input,
            });
        }
    }
    if let Ok(midi_output) = MidiOutput::new("midibay-device-list") {
        for (index, port) in midi_output.ports().iter().enumerate() {
            let name = midi_output
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Output {}", index));
            devices.push(MidiDeviceInfo {
                index,
                name,
                direction: Direction::Output,
            });
        }
    }
    devices
}

/// Open hardware input. Dropping it closes the port.
pub struct MidirInput {
    _connection: MidiInputConnection<()>,
    pub name: String,
}

/// Opens input port `port_index` and dispatches everything it receives as
/// `endpoint`. SysEx, timing and active sensing are not filtered by the driver.
pub fn connect_midir_input(
    router: &MidiRouter,
    endpoint: EndpointId,
    port_index: usize,
) -> Result<MidirInput> {
    let mut midi_input = MidiInput::new("midibay-input")?;
    midi_input.ignore(Ignore::None);

    let ports = midi_input.ports();
    let port = ports.get(port_index).ok_or_else(|| {
        Error::MidiDevice(format!("MIDI input device {} not found", port_index))
    })?;
    let name = midi_input
        .port_name(port)
        .unwrap_or_else(|_| format!("Device {}", port_index));

    let router = router.clone();
    let connection = midi_input.connect(
        port,
        "midibay-input",
        move |_timestamp, message, _| {
            if let Err(e) = router.dispatch(endpoint, message) {
                debug!("Dropping input from {}: {}", endpoint, e);
            }
        },
        (),
    )?;

    Ok(MidirInput {
        _connection: connection,
        name,
    })
}

/// Hardware output usable as a router sink.
pub struct MidirOutput {
    connection: MidiOutputConnection,
    pub name: String,
}

impl MidirOutput {
    pub fn connect(port_index: usize) -> Result<Self> {
        let midi_output = MidiOutput::new("midibay-output")?;

        let ports = midi_output.ports();
        let port = ports.get(port_index).ok_or_else(|| {
            Error::MidiDevice(format!("MIDI output device {} not found", port_index))
        })?;
        let name = midi_output
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {}", port_index));

        let connection = midi_output.connect(port, "midibay-output")?;
        Ok(Self { connection, name })
    }
}

impl OutputSink for MidirOutput {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.connection
            .send(bytes)
            .map_err(|e| Error::Send(e.to_string()))
    }
}
