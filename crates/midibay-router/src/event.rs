//! Visibility events produced for the UI collaborator.

use crate::endpoint::{Direction, EndpointId};
use crossbeam_channel::{Sender, TrySendError};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    /// A message seen at an input (before routing) or at an output.
    Message {
        endpoint: EndpointId,
        name: String,
        direction: Direction,
        bytes: Vec<u8>,
        filtered: bool,
        text: String,
    },
    LoopWarning {
        endpoint: EndpointId,
        name: String,
        elapsed_ms: u64,
    },
    /// Raised and cleared on change only.
    ClockSources {
        endpoint: EndpointId,
        name: String,
        multiple: bool,
    },
    SysexComplete {
        endpoint: EndpointId,
        name: String,
        bytes: Vec<u8>,
    },
    SysexOverflow {
        endpoint: EndpointId,
        name: String,
        limit: usize,
    },
    CycleRejected {
        input: EndpointId,
        output: EndpointId,
    },
    DeliveryFailed {
        endpoint: EndpointId,
        name: String,
        reason: String,
    },
    RoutingCleared {
        output: EndpointId,
        removed: Vec<EndpointId>,
    },
}

/// Non-blocking producer side of the event channel.
#[derive(Clone)]
pub(crate) struct EventSender {
    tx: Sender<RouterEvent>,
}

impl EventSender {
    pub(crate) fn new(tx: Sender<RouterEvent>) -> Self {
        Self { tx }
    }

    /// Drops the event when the channel is full or nobody listens.
    pub(crate) fn emit(&self, event: RouterEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                debug!("Event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
