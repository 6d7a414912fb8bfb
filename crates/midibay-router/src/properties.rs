//! Endpoint properties store.
//!
//! The engine owns one metadata record per attached endpoint, keyed by the
//! endpoint's opaque id. Endpoints themselves are never touched; detaching an
//! endpoint simply releases its record.

use crate::clock::ThrottleCounters;
use crate::endpoint::{ConnectionState, Direction, Endpoint, EndpointId};
use crate::filter::RuleSet;
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{Duration, Instant};

/// Routing state held by an input endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRouting {
    pub routed_outputs: BTreeSet<EndpointId>,
    /// Names mirror `routed_outputs` and survive the outputs being detached, so
    /// a replugged device is reconnected by name.
    pub routed_output_names: BTreeSet<String>,
}

/// Routing, loop guard and clock bookkeeping held by an output endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputRouting {
    pub routed_inputs: BTreeSet<EndpointId>,
    /// Live timing clock senders and when each was last heard.
    pub active_clock_sources: BTreeMap<EndpointId, Instant>,
    pub multiple_clock_sources: bool,
    pub last_payload: Option<([u8; 3], Instant)>,
    pub last_warning_at: Option<Instant>,
    /// Input that re-enters the engine when this output is a virtual loopback.
    pub loopback: Option<EndpointId>,
}

/// Outcome of the per-output feedback check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCheck {
    Clear,
    Loop { elapsed: Duration, warn: bool },
}

impl OutputRouting {
    /// Compares a 3-byte payload against the last one sent through this output.
    /// The stored payload and timestamp are always replaced.
    pub fn check_loop(
        &mut self,
        payload: [u8; 3],
        now: Instant,
        window: Duration,
        warning_interval: Duration,
    ) -> LoopCheck {
        let previous = self.last_payload.replace((payload, now));

        let Some((last, at)) = previous else {
            return LoopCheck::Clear;
        };
        let elapsed = now.saturating_duration_since(at);
        if last != payload || elapsed >= window {
            return LoopCheck::Clear;
        }

        let warn = match self.last_warning_at {
            Some(warned) => now.saturating_duration_since(warned) > warning_interval,
            None => true,
        };
        if warn {
            self.last_warning_at = Some(now);
        }
        LoopCheck::Loop { elapsed, warn }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Input(InputRouting),
    Output(OutputRouting),
}

/// Mutable metadata for one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointProperties {
    pub id: EndpointId,
    pub name: String,
    pub state: ConnectionState,
    pub rules: RuleSet,
    pub alias: Option<String>,
    pub tag: Option<String>,
    pub role: Role,
    pub(crate) throttle: ThrottleCounters,
}

impl EndpointProperties {
    fn new(endpoint: &Endpoint) -> Self {
        let role = match endpoint.direction {
            Direction::Input => Role::Input(InputRouting::default()),
            Direction::Output => Role::Output(OutputRouting::default()),
        };
        Self {
            id: endpoint.id,
            name: endpoint.name.clone(),
            state: ConnectionState::Connected,
            rules: RuleSet::default(),
            alias: None,
            tag: None,
            role,
            throttle: ThrottleCounters::default(),
        }
    }

    pub fn direction(&self) -> Direction {
        match self.role {
            Role::Input(_) => Direction::Input,
            Role::Output(_) => Direction::Output,
        }
    }

    /// Alias if one is set, otherwise the protocol-reported name.
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn as_input(&self) -> Option<&InputRouting> {
        match &self.role {
            Role::Input(routing) => Some(routing),
            Role::Output(_) => None,
        }
    }

    pub fn as_input_mut(&mut self) -> Option<&mut InputRouting> {
        match &mut self.role {
            Role::Input(routing) => Some(routing),
            Role::Output(_) => None,
        }
    }

    pub fn as_output(&self) -> Option<&OutputRouting> {
        match &self.role {
            Role::Output(routing) => Some(routing),
            Role::Input(_) => None,
        }
    }

    pub fn as_output_mut(&mut self) -> Option<&mut OutputRouting> {
        match &mut self.role {
            Role::Output(routing) => Some(routing),
            Role::Input(_) => None,
        }
    }
}

/// Identity-indexed map of endpoint records plus the display-tag index.
#[derive(Debug, Default)]
pub struct PropertiesStore {
    records: HashMap<EndpointId, EndpointProperties>,
    tags: HashMap<String, EndpointId>,
}

impl PropertiesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `endpoint`, creating it with direction-appropriate
    /// defaults on first access. Never creates two records for one id.
    pub fn get_or_create(&mut self, endpoint: &Endpoint) -> &mut EndpointProperties {
        self.records.entry(endpoint.id).or_insert_with(|| {
            tracing::debug!(
                "Created properties for {:?} endpoint {} ({})",
                endpoint.direction,
                endpoint.id,
                endpoint.name
            );
            EndpointProperties::new(endpoint)
        })
    }

    pub fn contains(&self, id: EndpointId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: EndpointId) -> Result<&EndpointProperties> {
        self.records.get(&id).ok_or(Error::UnknownEndpoint(id))
    }

    pub fn get_mut(&mut self, id: EndpointId) -> Result<&mut EndpointProperties> {
        self.records.get_mut(&id).ok_or(Error::UnknownEndpoint(id))
    }

    pub fn input(&self, id: EndpointId) -> Result<&InputRouting> {
        self.get(id)?.as_input().ok_or(Error::DirectionMismatch {
            endpoint: id,
            expected: Direction::Input,
        })
    }

    pub fn input_mut(&mut self, id: EndpointId) -> Result<&mut InputRouting> {
        self.get_mut(id)?.as_input_mut().ok_or(Error::DirectionMismatch {
            endpoint: id,
            expected: Direction::Input,
        })
    }

    pub fn output(&self, id: EndpointId) -> Result<&OutputRouting> {
        self.get(id)?.as_output().ok_or(Error::DirectionMismatch {
            endpoint: id,
            expected: Direction::Output,
        })
    }

    pub fn output_mut(&mut self, id: EndpointId) -> Result<&mut OutputRouting> {
        self.get_mut(id)?.as_output_mut().ok_or(Error::DirectionMismatch {
            endpoint: id,
            expected: Direction::Output,
        })
    }

    pub fn remove(&mut self, id: EndpointId) -> Option<EndpointProperties> {
        let removed = self.records.remove(&id)?;
        if let Some(tag) = &removed.tag {
            self.tags.remove(tag);
        }
        Some(removed)
    }

    /// Binds a display tag to an endpoint, replacing any previous tag it had.
    pub fn set_tag(&mut self, id: EndpointId, tag: impl Into<String>) -> Result<()> {
        let tag = tag.into();
        let record = self.records.get_mut(&id).ok_or(Error::UnknownEndpoint(id))?;
        if let Some(old) = record.tag.replace(tag.clone()) {
            self.tags.remove(&old);
        }
        if let Some(previous_owner) = self.tags.insert(tag, id) {
            if previous_owner != id {
                if let Some(other) = self.records.get_mut(&previous_owner) {
                    other.tag = None;
                }
            }
        }
        Ok(())
    }

    pub fn by_tag(&self, tag: &str) -> Option<&EndpointProperties> {
        self.tags.get(tag).and_then(|id| self.records.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointProperties> {
        self.records.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EndpointProperties> {
        self.records.values_mut()
    }

    /// Ids of every record with the given direction, in id order.
    pub fn ids(&self, direction: Direction) -> Vec<EndpointId> {
        let mut ids: Vec<EndpointId> = self
            .records
            .values()
            .filter(|p| p.direction() == direction)
            .map(|p| p.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn find_by_name(&self, direction: Direction, name: &str) -> Option<EndpointId> {
        self.records
            .values()
            .find(|p| p.direction() == direction && p.name == name)
            .map(|p| p.id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut store = PropertiesStore::new();
        let keys = Endpoint::input(1, "Keys");

        store.get_or_create(&keys).alias = Some("Main".to_string());
        let again = store.get_or_create(&keys);
        assert_eq!(again.alias.as_deref(), Some("Main"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_direction_defaults() {
        let mut store = PropertiesStore::new();
        store.get_or_create(&Endpoint::input(1, "In"));
        store.get_or_create(&Endpoint::output(2, "Out"));

        assert!(store.input(EndpointId(1)).is_ok());
        assert!(store.output(EndpointId(2)).is_ok());
        assert!(matches!(
            store.output(EndpointId(1)),
            Err(Error::DirectionMismatch { expected: Direction::Output, .. })
        ));
        assert!(matches!(
            store.get(EndpointId(9)),
            Err(Error::UnknownEndpoint(EndpointId(9)))
        ));
    }

    #[test]
    fn test_tag_lookup() {
        let mut store = PropertiesStore::new();
        store.get_or_create(&Endpoint::input(1, "In"));
        store.get_or_create(&Endpoint::output(2, "Out"));

        store.set_tag(EndpointId(1), "in-0").unwrap();
        assert_eq!(store.by_tag("in-0").map(|p| p.id), Some(EndpointId(1)));

        // Moving a tag releases it from the previous owner
        store.set_tag(EndpointId(2), "in-0").unwrap();
        assert_eq!(store.by_tag("in-0").map(|p| p.id), Some(EndpointId(2)));
        assert!(store.get(EndpointId(1)).unwrap().tag.is_none());

        store.remove(EndpointId(2));
        assert!(store.by_tag("in-0").is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_name() {
        let mut store = PropertiesStore::new();
        let record = store.get_or_create(&Endpoint::output(3, "Synth"));
        assert_eq!(record.display_name(), "Synth");
        record.alias = Some("Lead".to_string());
        assert_eq!(record.display_name(), "Lead");
    }

    #[test]
    fn test_loop_check_window() {
        let mut routing = OutputRouting::default();
        let t0 = Instant::now();
        let window = Duration::from_millis(10);
        let interval = Duration::from_millis(1000);
        let payload = [0x90, 60, 100];

        assert_eq!(routing.check_loop(payload, t0, window, interval), LoopCheck::Clear);
        let second = routing.check_loop(payload, t0 + Duration::from_millis(9), window, interval);
        assert_eq!(
            second,
            LoopCheck::Loop {
                elapsed: Duration::from_millis(9),
                warn: true
            }
        );

        // Warning is rate limited
        let third = routing.check_loop(payload, t0 + Duration::from_millis(12), window, interval);
        assert!(matches!(third, LoopCheck::Loop { warn: false, .. }));

        // 11ms after the last payload is outside the window
        let fourth = routing.check_loop(payload, t0 + Duration::from_millis(23), window, interval);
        assert_eq!(fourth, LoopCheck::Clear);
    }

    #[test]
    fn test_loop_check_different_payload_is_clear() {
        let mut routing = OutputRouting::default();
        let t0 = Instant::now();
        let window = Duration::from_millis(10);
        let interval = Duration::from_millis(1000);

        routing.check_loop([0x90, 60, 100], t0, window, interval);
        let next = routing.check_loop([0x90, 61, 100], t0 + Duration::from_millis(1), window, interval);
        assert_eq!(next, LoopCheck::Clear);
        assert_eq!(routing.last_payload.map(|(p, _)| p), Some([0x90, 61, 100]));
    }
}
