//! Engine state and the configuration surface.
//!
//! `EngineState` holds everything the dispatch path reads or mutates: endpoint
//! records, the routing graph, global rules, the SysEx assembler and the output
//! sinks. It is single-threaded; `MidiRouter` puts it behind one mutex.

use crate::config::RouterConfig;
use crate::endpoint::{ConnectionState, Direction, Endpoint, EndpointId, OutputSink};
use crate::event::{EventSender, RouterEvent};
use crate::filter::{ChannelRule, RuleSet};
use crate::properties::{EndpointProperties, PropertiesStore};
use crate::routing::EdgeToggle;
use crate::snapshot::RouterSnapshot;
use crate::sysex::SysexAssembler;
use crate::{Error, Result};
use midibay_midi::Classifier;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Where a filter or channel rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterScope {
    Global,
    Endpoint(EndpointId),
}

pub struct EngineState {
    pub(crate) config: RouterConfig,
    pub(crate) store: PropertiesStore,
    pub(crate) global: RuleSet,
    pub(crate) sysex: SysexAssembler,
    /// Inside a SysEx block on the wire, independent of capture.
    pub(crate) in_sysex_block: bool,
    pub(crate) sinks: HashMap<EndpointId, Box<dyn OutputSink>>,
    pub(crate) events: EventSender,
    pub(crate) show_clock: bool,
    pub(crate) auto_collect_sysex: bool,
    pub(crate) pending: Option<RouterSnapshot>,
}

impl EngineState {
    pub(crate) fn new(config: RouterConfig, events: EventSender) -> Self {
        Self {
            sysex: SysexAssembler::new(config.max_sysex_len),
            in_sysex_block: false,
            show_clock: config.show_clock,
            auto_collect_sysex: config.auto_collect_sysex,
            config,
            store: PropertiesStore::new(),
            global: RuleSet::default(),
            sinks: HashMap::new(),
            events,
            pending: None,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn store(&self) -> &PropertiesStore {
        &self.store
    }

    // ==================== Endpoint Lifecycle ====================

    pub fn attach_input(&mut self, endpoint: Endpoint) -> Result<()> {
        self.attach(&endpoint, Direction::Input)?;
        self.apply_pending_to(endpoint.id)?;
        self.restore_routes_from(endpoint.id)
    }

    pub fn attach_output(&mut self, endpoint: Endpoint, sink: Box<dyn OutputSink>) -> Result<()> {
        self.attach(&endpoint, Direction::Output)?;
        self.sinks.insert(endpoint.id, sink);
        self.apply_pending_to(endpoint.id)?;

        // Inputs that remember this output by name get their edge back
        for input in self.store.ids(Direction::Input) {
            let remembered = self
                .store
                .input(input)
                .map(|r| r.routed_output_names.contains(&endpoint.name))
                .unwrap_or(false);
            if remembered {
                self.restore_routes_from(input)?;
            }
        }
        Ok(())
    }

    fn attach(&mut self, endpoint: &Endpoint, expected: Direction) -> Result<()> {
        if endpoint.direction != expected {
            return Err(Error::DirectionMismatch {
                endpoint: endpoint.id,
                expected,
            });
        }
        if self.store.contains(endpoint.id) {
            return Err(Error::DuplicateEndpoint(endpoint.id));
        }
        self.store.get_or_create(endpoint);
        Ok(())
    }

    fn restore_routes_from(&mut self, input: EndpointId) -> Result<()> {
        for result in self.store.connect_by_name(input)? {
            if result == EdgeToggle::Rejected {
                debug!("Stored route from {} skipped, it would close a cycle", input);
            }
        }
        Ok(())
    }

    /// Releases an endpoint the platform has disposed of. Inputs keep the
    /// names of outputs they were routed to.
    pub fn detach(&mut self, id: EndpointId) -> Result<()> {
        match self.store.get(id)?.direction() {
            Direction::Input => {
                let outputs: Vec<EndpointId> =
                    self.store.input(id)?.routed_outputs.iter().copied().collect();
                self.store.unlink_input(id)?;
                for output in outputs {
                    self.refresh_clock_warning(output);
                }
            }
            Direction::Output => {
                self.store.unlink_output(id)?;
                self.sinks.remove(&id);
            }
        }
        if let Some(record) = self.store.remove(id) {
            debug!("Detached {:?} endpoint {} ({})", record.direction(), id, record.name);
        }
        Ok(())
    }

    /// An output turning `Unavailable` loses all of its routes.
    pub fn set_connection_state(&mut self, id: EndpointId, state: ConnectionState) -> Result<()> {
        let record = self.store.get_mut(id)?;
        record.state = state;
        let is_output = record.direction() == Direction::Output;

        if is_output && state == ConnectionState::Unavailable {
            let removed = self.store.remove_all_edges_to(id)?;
            self.refresh_clock_warning(id);
            debug!("Output {} unavailable, cleared {} route(s)", id, removed.len());
            self.events.emit(RouterEvent::RoutingCleared {
                output: id,
                removed,
            });
        }
        Ok(())
    }

    /// Declares that `output` re-enters the engine as `input`.
    pub fn set_loopback(&mut self, output: EndpointId, input: Option<EndpointId>) -> Result<()> {
        if let Some(input) = input {
            self.store.input(input)?;
        }
        self.store.output_mut(output)?.loopback = input;
        Ok(())
    }

    // ==================== Routing ====================

    pub fn toggle_edge(&mut self, input: EndpointId, output: EndpointId) -> Result<EdgeToggle> {
        let result = self.store.toggle_edge(input, output)?;
        match result {
            EdgeToggle::Rejected => {
                self.events.emit(RouterEvent::CycleRejected { input, output });
            }
            EdgeToggle::Removed => self.refresh_clock_warning(output),
            EdgeToggle::Added => {}
        }
        Ok(result)
    }

    pub fn remove_all_edges_to(&mut self, output: EndpointId) -> Result<Vec<EndpointId>> {
        let removed = self.store.remove_all_edges_to(output)?;
        self.refresh_clock_warning(output);
        Ok(removed)
    }

    pub fn reset_all_routing(&mut self) {
        self.store.reset_all_routing();
        self.refresh_all_clock_warnings();
    }

    // ==================== Rules ====================

    fn rules(&self, scope: FilterScope) -> Result<&RuleSet> {
        match scope {
            FilterScope::Global => Ok(&self.global),
            FilterScope::Endpoint(id) => Ok(&self.store.get(id)?.rules),
        }
    }

    fn rules_mut(&mut self, scope: FilterScope) -> Result<&mut RuleSet> {
        match scope {
            FilterScope::Global => Ok(&mut self.global),
            FilterScope::Endpoint(id) => Ok(&mut self.store.get_mut(id)?.rules),
        }
    }

    pub fn set_filter(
        &mut self,
        scope: FilterScope,
        classifier: Classifier,
        blocked: bool,
    ) -> Result<()> {
        self.rules_mut(scope)?.set_blocked(classifier, blocked);
        debug!("Filter {} {:?} blocked={}", classifier, scope, blocked);
        if classifier == Classifier::TIMING_CLOCK {
            self.refresh_all_clock_warnings();
        }
        Ok(())
    }

    pub fn filter_set(&self, scope: FilterScope) -> Result<BTreeSet<Classifier>> {
        Ok(self.rules(scope)?.filter_set.clone())
    }

    pub fn set_channel(&mut self, scope: FilterScope, rule: ChannelRule) -> Result<()> {
        rule.validate()?;
        self.rules_mut(scope)?.channel = rule;
        Ok(())
    }

    pub fn channel(&self, scope: FilterScope) -> Result<ChannelRule> {
        Ok(self.rules(scope)?.channel)
    }

    /// Clears every filter set and every channel rule.
    pub fn reset_all_filters(&mut self) {
        self.global.filter_set.clear();
        for record in self.store.iter_mut() {
            record.rules.filter_set.clear();
        }
        self.reset_all_channels();
        self.refresh_all_clock_warnings();
    }

    pub fn reset_all_channels(&mut self) {
        self.global.channel = ChannelRule::INACTIVE;
        for record in self.store.iter_mut() {
            record.rules.channel = ChannelRule::INACTIVE;
        }
    }

    // ==================== Aliases & Tags ====================

    pub fn set_alias(&mut self, id: EndpointId, alias: Option<String>) -> Result<()> {
        self.store.get_mut(id)?.alias = alias.filter(|a| !a.is_empty());
        Ok(())
    }

    pub fn alias(&self, id: EndpointId) -> Result<String> {
        Ok(self.store.get(id)?.display_name().to_string())
    }

    pub fn reset_all_aliases(&mut self) {
        for record in self.store.iter_mut() {
            record.alias = None;
        }
    }

    pub fn set_tag(&mut self, id: EndpointId, tag: impl Into<String>) -> Result<()> {
        self.store.set_tag(id, tag)
    }

    pub fn endpoint_by_tag(&self, tag: &str) -> Option<EndpointId> {
        self.store.by_tag(tag).map(|p| p.id)
    }

    // ==================== Runtime Toggles ====================

    pub fn set_show_clock(&mut self, show: bool) {
        self.show_clock = show;
    }

    pub fn set_auto_collect_sysex(&mut self, enabled: bool) {
        self.auto_collect_sysex = enabled;
        if !enabled {
            self.sysex.reset();
        }
    }

    /// All endpoint records, sorted by id.
    pub fn endpoints(&self) -> Vec<EndpointProperties> {
        let mut records: Vec<EndpointProperties> = self.store.iter().cloned().collect();
        records.sort_by_key(|p| p.id);
        records
    }
}
