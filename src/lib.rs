//! # midibay - MIDI Router
//!
//! Routes MIDI from any number of input ports to any number of output ports,
//! with global and per-port filters, channel remapping, SysEx reassembly and
//! feedback-loop protection.
//!
//! ## Architecture
//!
//! midibay is an umbrella crate over:
//! - **midibay-midi** - MIDI 1.0 byte-level types (classifier, channel nibble, rendering)
//! - **midibay-router** - Routing engine (graph, filters, reassembly, dispatch)
//!
//! ## Quick Start
//!
//! ```
//! use midibay::prelude::*;
//!
//! let router = MidiRouter::builder().build()?;
//! let synth = MemorySink::new();
//! router.attach_input(Endpoint::input(1, "Keys"))?;
//! router.attach_output(Endpoint::output(2, "Synth"), synth.clone())?;
//! router.toggle_edge(EndpointId(1), EndpointId(2))?;
//!
//! // Remap everything reaching the synth to channel 10
//! router.set_channel(FilterScope::Endpoint(EndpointId(2)), ChannelRule::reset(10)?)?;
//! router.dispatch(EndpointId(1), &[0x90, 36, 127])?;
//! assert_eq!(synth.sent(), vec![vec![0x99, 36, 127]]);
//! # Ok::<(), midibay::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `midi-io` - Hardware ports via midir

/// Re-export of midibay-midi for direct access
pub use midibay_midi as midi;

/// Re-export of midibay-router for direct access
pub use midibay_router as router;

pub use midibay_midi::{describe, note_name, Classifier};

pub use midibay_router::{
    ChannelRule, ConnectionState, DispatchOutcome, EdgeToggle, Endpoint, EndpointId,
    EndpointProperties, FilterScope, LivenessTimer, MemorySink, MidiRouter, MidiRouterBuilder,
    OutputSink, RouterConfig, RouterEvent, RouterSnapshot,
};

#[cfg(feature = "midi-io")]
pub use midibay_router::{connect_midir_input, list_midir_ports, MidirInput, MidirOutput};

mod error;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        ChannelRule, Classifier, ConnectionState, DispatchOutcome, EdgeToggle, Endpoint,
        EndpointId, FilterScope, MemorySink, MidiRouter, OutputSink, RouterEvent,
    };
    pub use crate::{Error, Result};
}
