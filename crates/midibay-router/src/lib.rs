//! MIDI routing engine.
//!
//! Receives raw MIDI from input endpoints and forwards it to output endpoints
//! according to a routing graph, global and per-endpoint filter rules, and
//! channel remaps. Reassembles SysEx blocks split over several packets and
//! skips forwarding when an output echoes a message straight back.
//!
//! The platform driver owns the endpoints. It attaches them, calls
//! [`MidiRouter::dispatch`] once per inbound message, and supplies an
//! [`OutputSink`] per output. Everything the UI needs to show arrives as
//! [`RouterEvent`]s.
//!
//! Feature gates: `midi-io` (midir hardware adapter).

pub mod error;
pub use error::{Error, Result};

mod config;
pub use config::RouterConfig;

mod endpoint;
pub use endpoint::{ConnectionState, Direction, Endpoint, EndpointId, OutputSink};

pub mod filter;
pub use filter::{apply_layered, apply_rules, ChannelRule, RuleSet};

mod properties;
pub use properties::{
    EndpointProperties, InputRouting, LoopCheck, OutputRouting, PropertiesStore, Role,
};

mod routing;
pub use routing::EdgeToggle;

pub mod sysex;
pub use sysex::{SysexAssembler, SysexProgress};

mod clock;
pub use clock::ThrottleCounters;

mod event;
pub use event::RouterEvent;

mod state;
pub use state::{EngineState, FilterScope};

mod dispatch;
pub use dispatch::DispatchOutcome;

mod snapshot;
pub use snapshot::{EndpointSnapshot, RouterSnapshot};

mod sink;
pub use sink::MemorySink;

mod system;
pub use system::{LivenessTimer, MidiRouter, MidiRouterBuilder};

#[cfg(feature = "midi-io")]
pub mod io;

#[cfg(feature = "midi-io")]
pub use io::{connect_midir_input, list_midir_ports, MidiDeviceInfo, MidirInput, MidirOutput};

pub use midibay_midi::Classifier;
