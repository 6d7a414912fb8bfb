//! Dispatch orchestrator.
//!
//! One inbound message is processed to completion: classify, run the input
//! side rules, surface, feed SysEx reassembly, then for each routed output run
//! the loop guard, the output rules, clock bookkeeping and delivery.

use crate::clock::is_throttled;
use crate::endpoint::{ConnectionState, Direction, EndpointId};
use crate::event::RouterEvent;
use crate::filter::{apply_layered, apply_rules};
use crate::properties::LoopCheck;
use crate::state::EngineState;
use crate::sysex::SysexProgress;
use crate::{Error, Result};
use midibay_midi::{describe, Classifier, SYSEX_END, SYSEX_START};
use smallvec::SmallVec;
use std::time::Instant;
use tracing::{debug, trace, warn};

type MessageBuf = SmallVec<[u8; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No recognizable classifier; nothing surfaced, nothing forwarded.
    Dropped,
    /// Blocked by the global or input rules.
    Filtered,
    /// Passed the input side. `delivered` counts outputs that accepted it.
    Routed { delivered: usize },
}

impl EngineState {
    /// Processes one raw message from input `source`.
    ///
    /// Only contract violations (unknown id, an output passed as source) are
    /// errors. Filtering, loop skips and delivery failures are outcomes.
    pub fn dispatch(
        &mut self,
        source: EndpointId,
        bytes: &[u8],
        now: Instant,
    ) -> Result<DispatchOutcome> {
        self.store.input(source)?;
        self.expire_clock_sources(now);

        let Some(classifier) = self.classify(bytes) else {
            trace!("Dropping unclassifiable message from {}: {:02X?}", source, bytes);
            return Ok(DispatchOutcome::Dropped);
        };

        let mut message = MessageBuf::from_slice(bytes);
        let record = self.store.get(source)?;
        let filtered = apply_layered(&mut message, classifier, &self.global, &record.rules);
        let outputs: SmallVec<[EndpointId; 8]> = match record.as_input() {
            Some(routing) if !filtered => routing.routed_outputs.iter().copied().collect(),
            _ => SmallVec::new(),
        };

        self.surface(source, Direction::Input, &message, filtered, classifier);
        if self.auto_collect_sysex {
            self.collect_sysex(source, bytes);
        }
        if filtered {
            return Ok(DispatchOutcome::Filtered);
        }

        let mut delivered = 0;
        for output in outputs {
            if self.forward(source, output, &message, classifier, now) {
                delivered += 1;
            }
        }
        Ok(DispatchOutcome::Routed { delivered })
    }

    /// Sends a stored block straight to one output, bypassing routing and
    /// rules. Returns whether the output accepted it; a closed or failing
    /// output is reported as `DeliveryFailed`.
    pub fn send_to(&mut self, output: EndpointId, bytes: &[u8]) -> Result<bool> {
        self.store.output(output)?;
        let name = self.store.get(output)?.display_name().to_string();
        debug!("Sending {} bytes directly to {}", bytes.len(), name);
        Ok(self.deliver(output, name, bytes))
    }

    /// Runs time-driven housekeeping without a message.
    pub fn tick(&mut self, now: Instant) {
        self.expire_clock_sources(now);
    }

    /// A packet starting with a data byte continues an open SysEx block.
    ///
    /// The block opens on a packet starting with F0 and closes on one ending
    /// with F7. Capture settings and the reassembly cap do not affect it.
    fn classify(&mut self, bytes: &[u8]) -> Option<Classifier> {
        let (&first, &last) = (bytes.first()?, bytes.last()?);
        let classifier = match Classifier::from_status(first) {
            Some(classifier) => Some(classifier),
            None if self.in_sysex_block => Some(Classifier::SYSEX),
            None => None,
        };
        if first == SYSEX_START {
            self.in_sysex_block = true;
        }
        if last == SYSEX_END {
            self.in_sysex_block = false;
        }
        classifier
    }

    fn forward(
        &mut self,
        source: EndpointId,
        output: EndpointId,
        message: &[u8],
        classifier: Classifier,
        now: Instant,
    ) -> bool {
        let window = self.config.loop_window();
        let interval = self.config.loop_warning_interval();

        let Ok(record) = self.store.get_mut(output) else {
            return false;
        };
        let name = record.display_name().to_string();
        let Some(routing) = record.as_output_mut() else {
            return false;
        };

        if let Ok(payload) = <[u8; 3]>::try_from(message) {
            if let LoopCheck::Loop { elapsed, warn } =
                routing.check_loop(payload, now, window, interval)
            {
                debug!("Feedback loop on {}: repeat after {:?}", name, elapsed);
                if warn {
                    warn!("MIDI loop detected on output {}", name);
                    self.events.emit(RouterEvent::LoopWarning {
                        endpoint: output,
                        name,
                        elapsed_ms: elapsed.as_millis() as u64,
                    });
                }
                return false;
            }
        }

        // Each output gets its own copy so a channel reset here cannot leak
        let mut copy = MessageBuf::from_slice(message);
        let filtered = match self.store.get(output) {
            Ok(record) => apply_rules(&mut copy, classifier, &record.rules),
            Err(_) => return false,
        };
        self.surface(output, Direction::Output, &copy, filtered, classifier);
        if filtered {
            return false;
        }

        if classifier == Classifier::TIMING_CLOCK {
            self.track_clock_source(output, source, now);
        }
        self.deliver(output, name, &copy)
    }

    fn deliver(&mut self, output: EndpointId, name: String, bytes: &[u8]) -> bool {
        let state = self
            .store
            .get(output)
            .map(|p| p.state)
            .unwrap_or(ConnectionState::Unavailable);

        let result = match self.sinks.get_mut(&output) {
            None => Err(Error::Send("no sink attached".to_string())),
            Some(sink) => {
                let state = match state {
                    ConnectionState::Connected => sink.state(),
                    other => other,
                };
                if state == ConnectionState::Connected {
                    sink.send(bytes)
                } else {
                    Err(Error::Send(format!("output is {:?}", state)))
                }
            }
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Delivery to {} failed: {}", name, e);
                self.events.emit(RouterEvent::DeliveryFailed {
                    endpoint: output,
                    name,
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    /// Emits a message event, throttling clock and active sensing.
    fn surface(
        &mut self,
        id: EndpointId,
        direction: Direction,
        bytes: &[u8],
        filtered: bool,
        classifier: Classifier,
    ) {
        if is_throttled(classifier) {
            if !self.show_clock {
                return;
            }
            let config = &self.config;
            let Ok(record) = self.store.get_mut(id) else {
                return;
            };
            if !record.throttle.tick(classifier, config) {
                return;
            }
        }

        let Ok(record) = self.store.get(id) else {
            return;
        };
        self.events.emit(RouterEvent::Message {
            endpoint: id,
            name: record.display_name().to_string(),
            direction,
            bytes: bytes.to_vec(),
            filtered,
            text: describe(bytes),
        });
    }

    fn collect_sysex(&mut self, source: EndpointId, bytes: &[u8]) {
        let progress = self.sysex.feed(bytes);
        let name = || {
            self.store
                .get(source)
                .map(|p| p.display_name().to_string())
                .unwrap_or_default()
        };
        let event = match progress {
            SysexProgress::Complete(block) => {
                debug!("SysEx block complete: {} bytes", block.len());
                RouterEvent::SysexComplete {
                    endpoint: source,
                    name: name(),
                    bytes: block,
                }
            }
            SysexProgress::Overflow { limit } => RouterEvent::SysexOverflow {
                endpoint: source,
                name: name(),
                limit,
            },
            SysexProgress::Ignored | SysexProgress::Collecting => return,
        };
        self.events.emit(event);
    }
}
