//! Routing graph.
//!
//! Edges run from input endpoints to output endpoints and are stored on both
//! sides: `routed_outputs` on the input, `routed_inputs` on the output. Every
//! mutation here keeps the two in step.

use crate::endpoint::{Direction, EndpointId};
use crate::properties::{PropertiesStore, Role};
use crate::Result;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Result of toggling an edge. A rejection leaves the graph untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeToggle {
    Added,
    Removed,
    Rejected,
}

impl PropertiesStore {
    pub fn is_routed(&self, input: EndpointId, output: EndpointId) -> Result<bool> {
        self.output(output)?;
        Ok(self.input(input)?.routed_outputs.contains(&output))
    }

    /// Removes the edge when present, otherwise tries to add it through the
    /// cycle guard.
    pub fn toggle_edge(&mut self, input: EndpointId, output: EndpointId) -> Result<EdgeToggle> {
        if self.is_routed(input, output)? {
            self.remove_edge(input, output)?;
            debug!("Removed route {} -> {}", input, output);
            return Ok(EdgeToggle::Removed);
        }
        self.prevent_cycle(input, output)
    }

    /// Installs `input -> output` unless it would close a cycle.
    pub fn prevent_cycle(&mut self, input: EndpointId, output: EndpointId) -> Result<EdgeToggle> {
        if self.would_cycle(input, output) {
            warn!("Route {} -> {} would create a cycle, rejected", input, output);
            return Ok(EdgeToggle::Rejected);
        }
        self.install_edge(input, output)?;
        debug!("Added route {} -> {}", input, output);
        Ok(EdgeToggle::Added)
    }

    /// Depth-first search from `output` for a path back to `input`.
    ///
    /// Only edges leaving inputs are followed. An output continues into its
    /// loopback input, which is the only way the same device can appear on
    /// both sides of the graph.
    pub fn would_cycle(&self, input: EndpointId, output: EndpointId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![output];

        while let Some(node) = stack.pop() {
            if node == input {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            let Ok(record) = self.get(node) else {
                continue;
            };
            match &record.role {
                Role::Input(routing) => stack.extend(routing.routed_outputs.iter().copied()),
                Role::Output(routing) => stack.extend(routing.loopback),
            }
        }
        false
    }

    fn install_edge(&mut self, input: EndpointId, output: EndpointId) -> Result<()> {
        let output_name = self.get(output)?.name.clone();
        self.output_mut(output)?.routed_inputs.insert(input);
        let routing = self.input_mut(input)?;
        routing.routed_outputs.insert(output);
        routing.routed_output_names.insert(output_name);
        Ok(())
    }

    fn remove_edge(&mut self, input: EndpointId, output: EndpointId) -> Result<()> {
        let output_name = self.get(output)?.name.clone();
        let out = self.output_mut(output)?;
        out.routed_inputs.remove(&input);
        out.active_clock_sources.remove(&input);
        self.input_mut(input)?.routed_outputs.remove(&output);

        // Another live output may share the name
        let name_still_routed = self
            .input(input)?
            .routed_outputs
            .iter()
            .any(|&other| self.get(other).is_ok_and(|p| p.name == output_name));
        if !name_still_routed {
            self.input_mut(input)?.routed_output_names.remove(&output_name);
        }
        Ok(())
    }

    /// Clears every edge into `output` on both sides, names included, and its
    /// clock sources. Returns the inputs that were connected.
    pub fn remove_all_edges_to(&mut self, output: EndpointId) -> Result<Vec<EndpointId>> {
        let inputs: Vec<EndpointId> = self.output(output)?.routed_inputs.iter().copied().collect();
        for &input in &inputs {
            self.remove_edge(input, output)?;
        }
        self.output_mut(output)?.active_clock_sources.clear();
        Ok(inputs)
    }

    /// Drops live edges into `output` but keeps the name mirror on each input,
    /// so the route comes back when a device with that name is attached again.
    pub(crate) fn unlink_output(&mut self, output: EndpointId) -> Result<()> {
        let inputs: Vec<EndpointId> = self.output(output)?.routed_inputs.iter().copied().collect();
        for input in inputs {
            if let Ok(routing) = self.input_mut(input) {
                routing.routed_outputs.remove(&output);
            }
        }
        let routing = self.output_mut(output)?;
        routing.routed_inputs.clear();
        routing.active_clock_sources.clear();
        Ok(())
    }

    /// Removes every edge touching `input` and its loopback references.
    pub(crate) fn unlink_input(&mut self, input: EndpointId) -> Result<()> {
        let outputs: Vec<EndpointId> = self.input(input)?.routed_outputs.iter().copied().collect();
        for output in outputs {
            if let Ok(routing) = self.output_mut(output) {
                routing.routed_inputs.remove(&input);
                routing.active_clock_sources.remove(&input);
            }
        }
        for record in self.iter_mut() {
            if let Some(routing) = record.as_output_mut() {
                if routing.loopback == Some(input) {
                    routing.loopback = None;
                }
            }
        }
        self.input_mut(input)?.routed_outputs.clear();
        Ok(())
    }

    pub fn reset_all_routing(&mut self) {
        for record in self.iter_mut() {
            match &mut record.role {
                Role::Input(routing) => {
                    routing.routed_outputs.clear();
                    routing.routed_output_names.clear();
                }
                Role::Output(routing) => {
                    routing.routed_inputs.clear();
                    routing.active_clock_sources.clear();
                }
            }
        }
        debug!("Reset all routing");
    }

    /// Every edge as `(input, output)`, sorted.
    pub fn edges(&self) -> Vec<(EndpointId, EndpointId)> {
        let mut edges = Vec::new();
        for input in self.ids(Direction::Input) {
            if let Ok(routing) = self.input(input) {
                edges.extend(routing.routed_outputs.iter().map(|&output| (input, output)));
            }
        }
        edges
    }

    /// Restores edges from `input` to attached outputs named in its name mirror.
    pub(crate) fn connect_by_name(&mut self, input: EndpointId) -> Result<Vec<EdgeToggle>> {
        let names = self.input(input)?.routed_output_names.clone();
        let mut results = Vec::new();
        for name in names {
            let Some(output) = self.find_by_name(Direction::Output, &name) else {
                continue;
            };
            if !self.is_routed(input, output)? {
                results.push(self.prevent_cycle(input, output)?);
            }
        }
        Ok(results)
    }
}
