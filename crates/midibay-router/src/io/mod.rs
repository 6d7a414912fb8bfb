//! Hardware MIDI I/O.
//!
//! Bridges midir ports to the router: inputs feed `MidiRouter::dispatch`,
//! outputs implement `OutputSink`. Requires the `midi-io` feature.

mod hardware;

pub use hardware::{connect_midir_input, list_midir_ports, MidiDeviceInfo, MidirInput, MidirOutput};
