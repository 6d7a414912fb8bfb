//! Error types for the MIDI routing engine.
//!
//! Policy outcomes (a rejected cyclic edge, a skipped feedback loop, a filtered
//! message) are not errors. They are reported as return values and events.

use crate::endpoint::{Direction, EndpointId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown endpoint {0}")]
    UnknownEndpoint(EndpointId),

    #[error("Endpoint {endpoint} is not an {expected:?} endpoint")]
    DirectionMismatch {
        endpoint: EndpointId,
        expected: Direction,
    },

    #[error("Endpoint {0} is already attached")]
    DuplicateEndpoint(EndpointId),

    #[error("Invalid channel value {0} (expected 0-16)")]
    InvalidChannel(u8),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("MIDI send failed: {0}")]
    Send(String),

    #[error("MIDI device error: {0}")]
    MidiDevice(String),

    #[error("MIDI port error: {0}")]
    MidiPort(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::MidiDevice(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::MidiPort(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::MidiPort(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
