//! In-memory cell implementing every collaborator the allocator consumes.

use std::collections::{BTreeMap, BTreeSet};

use api_types::{Direction, FlowId, NodeId};
use lyapunov::{
    ChannelEstimator, GrantExecutor, GrantOutcome, IdentityResolver, NetworkIdentity,
    QueueStateProvider, ResourceEstimate,
};

use crate::scenario::Scenario;

#[derive(Debug, Clone)]
struct FlowState {
    backlog: u64,
    arrival_bytes_per_slot: u64,
}

#[derive(Debug, Clone)]
struct NodeState {
    bytes_per_unit: Option<u64>,
    channel_from_slot: u64,
    depart_at_slot: Option<u64>,
}

/// Per-node channel quality, per-flow queues and a per-slot pool of resource
/// units shared by all grants of the slot.
#[derive(Debug, Clone)]
pub struct SimulatedCell {
    units_per_slot: u32,
    units_left: u32,
    slot: u64,
    flows: BTreeMap<FlowId, FlowState>,
    nodes: BTreeMap<NodeId, NodeState>,
    departed: BTreeSet<NodeId>,
}

impl SimulatedCell {
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let mut flows = BTreeMap::new();
        let mut nodes = BTreeMap::new();
        for flow in &scenario.flows {
            flows.insert(
                flow.id(),
                FlowState {
                    backlog: flow.initial_backlog,
                    arrival_bytes_per_slot: flow.arrival_bytes_per_slot,
                },
            );
            // Scenario::validate rejects nodes whose flows disagree on channel
            // settings, so the first flow of a node speaks for all of them
            let node = nodes.entry(flow.node).or_insert(NodeState {
                bytes_per_unit: flow.bytes_per_unit,
                channel_from_slot: flow.channel_from_slot,
                depart_at_slot: flow.depart_at_slot,
            });
            // a node leaves with its earliest departing flow
            node.depart_at_slot = match (node.depart_at_slot, flow.depart_at_slot) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
        Self {
            units_per_slot: scenario.cell.resource_units_per_slot,
            units_left: scenario.cell.resource_units_per_slot,
            slot: 0,
            flows,
            nodes,
            departed: BTreeSet::new(),
        }
    }

    pub fn units_left(&self) -> u32 {
        self.units_left
    }

    pub fn flow_ids(&self) -> impl Iterator<Item = FlowId> + '_ {
        self.flows.keys().copied()
    }

    pub fn backlog(&self, flow: FlowId) -> u64 {
        self.flows.get(&flow).map_or(0, |f| f.backlog)
    }

    /// Open slot `slot`: refill the unit pool, apply departures and queue new
    /// arrivals.
    ///
    /// Returns every flow that now has data waiting so the caller can put it
    /// back into the active set.
    pub fn begin_slot(&mut self, slot: u64) -> Vec<FlowId> {
        self.slot = slot;
        self.units_left = self.units_per_slot;

        for (node, state) in &self.nodes {
            if state.depart_at_slot.is_some_and(|at| at <= slot) && self.departed.insert(*node) {
                tracing::info!(slot, node, "node left the cell");
            }
        }

        let mut backlogged = Vec::new();
        for (id, flow) in self.flows.iter_mut() {
            if self.departed.contains(&id.node) {
                continue;
            }
            flow.backlog = flow.backlog.saturating_add(flow.arrival_bytes_per_slot);
            if flow.backlog > 0 {
                backlogged.push(*id);
            }
        }
        backlogged
    }

    fn channel(&self, node: NodeId) -> Option<u64> {
        let state = self.nodes.get(&node)?;
        if self.slot < state.channel_from_slot {
            return None;
        }
        state.bytes_per_unit
    }
}

impl IdentityResolver for SimulatedCell {
    fn resolve_identity(&self, flow: FlowId) -> Option<NetworkIdentity> {
        if self.departed.contains(&flow.node) || !self.nodes.contains_key(&flow.node) {
            return None;
        }
        Some(NetworkIdentity {
            node: flow.node,
            handle: u64::from(flow.node) + 1,
        })
    }
}

impl QueueStateProvider for SimulatedCell {
    fn backlog_bytes(&self, flow: FlowId, _direction: Direction) -> u64 {
        self.backlog(flow)
    }
}

impl ChannelEstimator for SimulatedCell {
    fn estimate(&self, identity: &NetworkIdentity, _direction: Direction) -> Option<ResourceEstimate> {
        let bytes_per_unit = self.channel(identity.node)?;
        Some(ResourceEstimate::new(
            self.units_left,
            u64::from(self.units_left).saturating_mul(bytes_per_unit),
        ))
    }
}

impl GrantExecutor for SimulatedCell {
    fn request_grant(&mut self, flow: FlowId, max_bytes: u64) -> GrantOutcome {
        let bytes_per_unit = self.channel(flow.node).unwrap_or(0);
        let units_left = self.units_left;
        let Some(state) = self.flows.get_mut(&flow) else {
            return GrantOutcome {
                granted_bytes: 0,
                terminate: units_left == 0,
                active: false,
                eligible: false,
            };
        };
        if bytes_per_unit == 0 || units_left == 0 {
            return GrantOutcome {
                granted_bytes: 0,
                terminate: units_left == 0,
                active: state.backlog > 0,
                eligible: false,
            };
        }

        let wanted = state.backlog.min(max_bytes);
        let units = u32::try_from(wanted.div_ceil(bytes_per_unit))
            .unwrap_or(u32::MAX)
            .min(units_left);
        let granted = (u64::from(units) * bytes_per_unit).min(wanted);

        state.backlog -= granted;
        self.units_left -= units;
        tracing::trace!(flow = %flow, units, granted, backlog = state.backlog, "grant");

        GrantOutcome {
            granted_bytes: granted,
            terminate: self.units_left == 0,
            active: state.backlog > 0,
            eligible: state.backlog > 0 && self.units_left > 0,
        }
    }
}
