//! Endpoint identity and the outbound forwarding seam.
//!
//! Endpoints are owned by the platform driver. The router only holds their
//! identity and observes connection-state transitions.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, process-local endpoint handle. Not durable across sessions; use the
/// endpoint name for anything persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndpointId(pub u64);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

/// Forwarding is only attempted while an output is `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connected,
    Closed,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub id: EndpointId,
    pub name: String,
    pub direction: Direction,
}

impl Endpoint {
    pub fn input(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: EndpointId(id),
            name: name.into(),
            direction: Direction::Input,
        }
    }

    pub fn output(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: EndpointId(id),
            name: name.into(),
            direction: Direction::Output,
        }
    }
}

/// Per-output send capability supplied by the platform.
///
/// `send` is fire-and-forget: an `Err` is reported as a delivery failure and
/// never aborts delivery to the remaining outputs.
pub trait OutputSink: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    fn state(&self) -> ConnectionState {
        ConnectionState::Connected
    }
}
