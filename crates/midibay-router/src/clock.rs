//! Timing clock handling: visibility throttling and clock-source liveness.

use crate::config::RouterConfig;
use crate::endpoint::{Direction, EndpointId};
use crate::event::RouterEvent;
use crate::filter::RuleSet;
use crate::state::EngineState;
use midibay_midi::Classifier;
use std::time::Instant;
use tracing::debug;

/// Per-endpoint rolling counters for high-rate real-time traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleCounters {
    clock: u32,
    active_sensing: u32,
}

impl ThrottleCounters {
    /// Counts one occurrence and returns whether it should be surfaced.
    /// Other classifiers always pass.
    pub fn tick(&mut self, classifier: Classifier, config: &RouterConfig) -> bool {
        let (counter, every) = match classifier {
            Classifier::TIMING_CLOCK => (&mut self.clock, config.clock_display_every),
            Classifier::ACTIVE_SENSING => {
                (&mut self.active_sensing, config.active_sensing_display_every)
            }
            _ => return true,
        };
        *counter += 1;
        if *counter >= every {
            *counter = 0;
            true
        } else {
            false
        }
    }
}

#[inline]
pub(crate) fn is_throttled(classifier: Classifier) -> bool {
    classifier == Classifier::TIMING_CLOCK || classifier == Classifier::ACTIVE_SENSING
}

#[inline]
fn clock_blocked(rules: &RuleSet) -> bool {
    rules.blocks(Classifier::TIMING_CLOCK)
}

impl EngineState {
    /// Records `source` as a live clock sender on `output`.
    pub(crate) fn track_clock_source(&mut self, output: EndpointId, source: EndpointId, now: Instant) {
        let Ok(routing) = self.store.output_mut(output) else {
            return;
        };
        if routing.active_clock_sources.insert(source, now).is_none() {
            debug!("Clock source {} now live on output {}", source, output);
        }
        self.refresh_clock_warning(output);
    }

    /// Evicts clock sources not refreshed within the configured timeout.
    pub(crate) fn expire_clock_sources(&mut self, now: Instant) {
        let timeout = self.config.clock_timeout();
        let mut touched = Vec::new();

        for record in self.store.iter_mut() {
            let id = record.id;
            let Some(routing) = record.as_output_mut() else {
                continue;
            };
            let before = routing.active_clock_sources.len();
            routing
                .active_clock_sources
                .retain(|_, seen| now.saturating_duration_since(*seen) < timeout);
            if routing.active_clock_sources.len() != before {
                debug!(
                    "Evicted {} stale clock source(s) from output {}",
                    before - routing.active_clock_sources.len(),
                    id
                );
                touched.push(id);
            }
        }

        for output in touched {
            self.refresh_clock_warning(output);
        }
    }

    /// Re-derives the multiple-clock-source flag for one output and emits
    /// `ClockSources` when it changes.
    pub(crate) fn refresh_clock_warning(&mut self, output: EndpointId) {
        let Ok(record) = self.store.get(output) else {
            return;
        };
        let Some(routing) = record.as_output() else {
            return;
        };

        let blocked = clock_blocked(&self.global) || clock_blocked(&record.rules);
        let evicted: Vec<EndpointId> = if blocked {
            Vec::new()
        } else {
            routing
                .active_clock_sources
                .keys()
                .copied()
                .filter(|source| {
                    self.store
                        .get(*source)
                        .map(|p| clock_blocked(&p.rules))
                        .unwrap_or(true)
                })
                .collect()
        };

        let Ok(record) = self.store.get_mut(output) else {
            return;
        };
        let name = record.display_name().to_string();
        let Some(routing) = record.as_output_mut() else {
            return;
        };
        for source in &evicted {
            routing.active_clock_sources.remove(source);
        }
        let multiple = !blocked && routing.active_clock_sources.len() > 1;
        if multiple == routing.multiple_clock_sources {
            return;
        }
        routing.multiple_clock_sources = multiple;
        if multiple {
            tracing::warn!("Multiple clock sources routed to output {}", name);
        }
        self.events.emit(RouterEvent::ClockSources {
            endpoint: output,
            name,
            multiple,
        });
    }

    pub(crate) fn refresh_all_clock_warnings(&mut self) {
        for output in self.store.ids(Direction::Output) {
            self.refresh_clock_warning(output);
        }
    }
}
