//! Thread-safe router handle.
//!
//! ## Quick Start
//!
//! ```
//! use midibay_router::{Endpoint, EndpointId, MemorySink, MidiRouter};
//!
//! let router = MidiRouter::builder().build()?;
//! let synth = MemorySink::new();
//!
//! router.attach_input(Endpoint::input(1, "Keys"))?;
//! router.attach_output(Endpoint::output(2, "Synth"), synth.clone())?;
//! router.toggle_edge(EndpointId(1), EndpointId(2))?;
//!
//! router.dispatch(EndpointId(1), &[0x90, 60, 100])?;
//! assert_eq!(synth.sent(), vec![vec![0x90, 60, 100]]);
//! # Ok::<(), midibay_router::Error>(())
//! ```

mod builder;
mod timer;

pub use builder::MidiRouterBuilder;
pub use timer::LivenessTimer;

use crate::config::RouterConfig;
use crate::dispatch::DispatchOutcome;
use crate::endpoint::{ConnectionState, Endpoint, EndpointId, OutputSink};
use crate::event::RouterEvent;
use crate::filter::ChannelRule;
use crate::properties::EndpointProperties;
use crate::routing::EdgeToggle;
use crate::snapshot::RouterSnapshot;
use crate::state::{EngineState, FilterScope};
use crate::Result;
use crossbeam_channel::Receiver;
use midibay_midi::Classifier;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// MidiRouter - Main Entry Point
// ============================================================================

/// Handle to one routing engine.
///
/// Clone is cheap (Arc internally). Dispatch, configuration and the liveness
/// timer all go through the same lock, so no caller sees half-updated state.
#[derive(Clone)]
pub struct MidiRouter {
    inner: Arc<RouterInner>,
}

pub(crate) struct RouterInner {
    pub(crate) state: Mutex<EngineState>,
    pub(crate) events: Receiver<RouterEvent>,
}

impl MidiRouter {
    pub fn builder() -> MidiRouterBuilder {
        MidiRouterBuilder::default()
    }

    pub fn config(&self) -> RouterConfig {
        self.inner.state.lock().config().clone()
    }

    // ==================== Dispatch ====================

    /// Inbound callback for one raw message from an input endpoint.
    pub fn dispatch(&self, source: EndpointId, bytes: &[u8]) -> Result<DispatchOutcome> {
        self.dispatch_at(source, bytes, Instant::now())
    }

    pub fn dispatch_at(
        &self,
        source: EndpointId,
        bytes: &[u8],
        now: Instant,
    ) -> Result<DispatchOutcome> {
        self.inner.state.lock().dispatch(source, bytes, now)
    }

    /// Sends a stored block, such as a loaded SysEx file, to one output.
    pub fn send_to(&self, output: EndpointId, bytes: &[u8]) -> Result<bool> {
        self.inner.state.lock().send_to(output, bytes)
    }

    pub fn tick(&self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&self, now: Instant) {
        self.inner.state.lock().tick(now);
    }

    /// Starts a thread that evicts stale clock sources while the router lives.
    pub fn spawn_liveness_timer(&self) -> Result<LivenessTimer> {
        let interval = self.inner.state.lock().config().timer_interval();
        LivenessTimer::spawn(Arc::downgrade(&self.inner), interval)
    }

    // ==================== Endpoints ====================

    pub fn attach_input(&self, endpoint: Endpoint) -> Result<()> {
        self.inner.state.lock().attach_input(endpoint)
    }

    pub fn attach_output(&self, endpoint: Endpoint, sink: impl OutputSink + 'static) -> Result<()> {
        self.inner
            .state
            .lock()
            .attach_output(endpoint, Box::new(sink))
    }

    pub fn detach(&self, id: EndpointId) -> Result<()> {
        self.inner.state.lock().detach(id)
    }

    pub fn set_connection_state(&self, id: EndpointId, state: ConnectionState) -> Result<()> {
        self.inner.state.lock().set_connection_state(id, state)
    }

    pub fn set_loopback(&self, output: EndpointId, input: Option<EndpointId>) -> Result<()> {
        self.inner.state.lock().set_loopback(output, input)
    }

    /// All endpoint records, sorted by id.
    pub fn endpoints(&self) -> Vec<EndpointProperties> {
        self.inner.state.lock().endpoints()
    }

    pub fn set_alias(&self, id: EndpointId, alias: Option<String>) -> Result<()> {
        self.inner.state.lock().set_alias(id, alias)
    }

    /// Alias, or the endpoint name when none is set.
    pub fn alias(&self, id: EndpointId) -> Result<String> {
        self.inner.state.lock().alias(id)
    }

    pub fn reset_all_aliases(&self) {
        self.inner.state.lock().reset_all_aliases();
    }

    pub fn set_tag(&self, id: EndpointId, tag: impl Into<String>) -> Result<()> {
        self.inner.state.lock().set_tag(id, tag)
    }

    pub fn endpoint_by_tag(&self, tag: &str) -> Option<EndpointId> {
        self.inner.state.lock().endpoint_by_tag(tag)
    }

    // ==================== Routing ====================

    pub fn toggle_edge(&self, input: EndpointId, output: EndpointId) -> Result<EdgeToggle> {
        self.inner.state.lock().toggle_edge(input, output)
    }

    pub fn is_routed(&self, input: EndpointId, output: EndpointId) -> Result<bool> {
        self.inner.state.lock().store().is_routed(input, output)
    }

    pub fn routing_edges(&self) -> Vec<(EndpointId, EndpointId)> {
        self.inner.state.lock().store().edges()
    }

    pub fn remove_all_edges_to(&self, output: EndpointId) -> Result<Vec<EndpointId>> {
        self.inner.state.lock().remove_all_edges_to(output)
    }

    pub fn reset_all_routing(&self) {
        self.inner.state.lock().reset_all_routing();
    }

    // ==================== Filters ====================

    pub fn set_filter(&self, scope: FilterScope, classifier: Classifier, blocked: bool) -> Result<()> {
        self.inner.state.lock().set_filter(scope, classifier, blocked)
    }

    pub fn filter_set(&self, scope: FilterScope) -> Result<BTreeSet<Classifier>> {
        self.inner.state.lock().filter_set(scope)
    }

    pub fn set_channel(&self, scope: FilterScope, rule: ChannelRule) -> Result<()> {
        self.inner.state.lock().set_channel(scope, rule)
    }

    pub fn channel(&self, scope: FilterScope) -> Result<ChannelRule> {
        self.inner.state.lock().channel(scope)
    }

    pub fn reset_all_filters(&self) {
        self.inner.state.lock().reset_all_filters();
    }

    pub fn reset_all_channels(&self) {
        self.inner.state.lock().reset_all_channels();
    }

    pub fn set_show_clock(&self, show: bool) {
        self.inner.state.lock().set_show_clock(show);
    }

    pub fn set_auto_collect_sysex(&self, enabled: bool) {
        self.inner.state.lock().set_auto_collect_sysex(enabled);
    }

    // ==================== Persistence ====================

    pub fn snapshot(&self) -> RouterSnapshot {
        self.inner.state.lock().snapshot()
    }

    pub fn restore(&self, snapshot: RouterSnapshot) -> Result<()> {
        self.inner.state.lock().restore(snapshot)
    }

    // ==================== Events ====================

    /// Receiver for visibility events. Clones share one queue.
    pub fn events(&self) -> Receiver<RouterEvent> {
        self.inner.events.clone()
    }

    pub fn try_recv_event(&self) -> Option<RouterEvent> {
        self.inner.events.try_recv().ok()
    }

    pub fn drain_events(&self) -> Vec<RouterEvent> {
        self.inner.events.try_iter().collect()
    }
}
