//! Name-keyed configuration snapshots.
//!
//! Endpoint ids are process-local, so persisted configuration is addressed by
//! endpoint name. Sets serialize as arrays; the byte format is left to the
//! caller.

use crate::endpoint::{Direction, EndpointId};
use crate::filter::{ChannelRule, RuleSet};
use crate::properties::EndpointProperties;
use crate::state::EngineState;
use crate::Result;
use midibay_midi::Classifier;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSnapshot {
    pub filter_set: BTreeSet<Classifier>,
    pub channel: ChannelRule,
    pub alias: Option<String>,
    /// Output names; empty for outputs.
    pub routed_outputs: BTreeSet<String>,
}

impl EndpointSnapshot {
    fn capture(record: &EndpointProperties) -> Self {
        Self {
            filter_set: record.rules.filter_set.clone(),
            channel: record.rules.channel,
            alias: record.alias.clone(),
            routed_outputs: record
                .as_input()
                .map(|r| r.routed_output_names.clone())
                .unwrap_or_default(),
        }
    }

    fn apply_rules(&self, record: &mut EndpointProperties) {
        record.rules = RuleSet {
            filter_set: self.filter_set.clone(),
            channel: self.channel,
        };
        record.alias = self.alias.clone();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSnapshot {
    pub global: RuleSet,
    pub inputs: BTreeMap<String, EndpointSnapshot>,
    pub outputs: BTreeMap<String, EndpointSnapshot>,
}

impl RouterSnapshot {
    fn entry(&self, direction: Direction, name: &str) -> Option<&EndpointSnapshot> {
        match direction {
            Direction::Input => self.inputs.get(name),
            Direction::Output => self.outputs.get(name),
        }
    }

    fn validate(&self) -> Result<()> {
        self.global.channel.validate()?;
        for entry in self.inputs.values().chain(self.outputs.values()) {
            entry.channel.validate()?;
        }
        Ok(())
    }
}

impl EngineState {
    /// Captures global rules and every attached endpoint by name.
    pub fn snapshot(&self) -> RouterSnapshot {
        let mut snapshot = RouterSnapshot {
            global: self.global.clone(),
            ..Default::default()
        };
        for record in self.endpoints() {
            let entry = EndpointSnapshot::capture(&record);
            match record.direction() {
                Direction::Input => snapshot.inputs.insert(record.name.clone(), entry),
                Direction::Output => snapshot.outputs.insert(record.name.clone(), entry),
            };
        }
        snapshot
    }

    /// Applies a snapshot to attached endpoints by name and keeps it pending for
    /// endpoints attached later. Endpoints not named in it are left alone.
    pub fn restore(&mut self, snapshot: RouterSnapshot) -> Result<()> {
        snapshot.validate()?;
        self.global = snapshot.global.clone();

        let attached: Vec<EndpointId> = self.endpoints().iter().map(|p| p.id).collect();
        self.pending = Some(snapshot);
        for id in &attached {
            self.apply_pending_to(*id)?;
        }
        for id in attached {
            if self.store.get(id)?.direction() == Direction::Input {
                for result in self.store.connect_by_name(id)? {
                    debug!("Restored route from {}: {:?}", id, result);
                }
            }
        }

        self.refresh_all_clock_warnings();
        Ok(())
    }

    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Applies the pending snapshot entry matching this endpoint's name.
    /// An input's current edges are replaced by the stored route names.
    pub(crate) fn apply_pending_to(&mut self, id: EndpointId) -> Result<()> {
        let Some(snapshot) = self.pending.take() else {
            return Ok(());
        };
        let result = self.apply_entry(&snapshot, id);
        self.pending = Some(snapshot);
        result
    }

    fn apply_entry(&mut self, snapshot: &RouterSnapshot, id: EndpointId) -> Result<()> {
        let record = self.store.get(id)?;
        let direction = record.direction();
        let Some(entry) = snapshot.entry(direction, &record.name) else {
            return Ok(());
        };

        entry.apply_rules(self.store.get_mut(id)?);

        if direction == Direction::Input {
            let current: Vec<EndpointId> =
                self.store.input(id)?.routed_outputs.iter().copied().collect();
            for output in current {
                self.store.toggle_edge(id, output)?;
            }
            self.store.input_mut(id)?.routed_output_names = entry.routed_outputs.clone();
        }
        Ok(())
    }
}
