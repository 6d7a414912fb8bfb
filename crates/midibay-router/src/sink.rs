//! In-memory output sink for virtual endpoints and tests.

use crate::endpoint::{ConnectionState, OutputSink};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct SinkShared {
    sent: Vec<Vec<u8>>,
    state: ConnectionState,
    fail_sends: bool,
}

/// Collects every forwarded message. Cloning shares the buffer, so one clone
/// can be handed to the router while another inspects what arrived.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    shared: Arc<Mutex<SinkShared>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared.lock().sent.clone()
    }

    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.shared.lock().sent)
    }

    pub fn sent_count(&self) -> usize {
        self.shared.lock().sent.len()
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.shared.lock().state = state;
    }

    /// Makes every subsequent `send` fail, simulating a device error.
    pub fn set_failing(&self, failing: bool) {
        self.shared.lock().fail_sends = failing;
    }
}

impl OutputSink for MemorySink {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let mut shared = self.shared.lock();
        if shared.fail_sends {
            return Err(Error::Send("memory sink rejected message".to_string()));
        }
        shared.sent.push(bytes.to_vec());
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_buffer() {
        let sink = MemorySink::new();
        let mut handle: Box<dyn OutputSink> = Box::new(sink.clone());

        handle.send(&[0x90, 60, 100]).unwrap();
        handle.send(&[0x80, 60, 0]).unwrap();

        assert_eq!(sink.sent_count(), 2);
        assert_eq!(sink.take()[0], vec![0x90, 60, 100]);
        assert_eq!(sink.sent_count(), 0);
    }

    #[test]
    fn test_state_and_failure() {
        let sink = MemorySink::new();
        assert_eq!(sink.state(), ConnectionState::Connected);

        sink.set_state(ConnectionState::Closed);
        assert_eq!(OutputSink::state(&sink), ConnectionState::Closed);

        sink.set_failing(true);
        let mut boxed: Box<dyn OutputSink> = Box::new(sink.clone());
        assert!(matches!(boxed.send(&[0xF8]), Err(Error::Send(_))));
        assert!(sink.sent().is_empty());
    }
}
