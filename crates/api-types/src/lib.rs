//! Shared type definitions
//!
//! This crate contains the flow and QoS types shared between the allocator core
//! and the cell simulator: flow identifiers, link directions and the static QoS
//! context attached to each flow class.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Identifier of a user equipment (or any schedulable node) in the cell.
pub type NodeId = u16;

/// Logical channel identifier within a node.
pub type Lcid = u16;

/// QoS flow identifier, i.e. the flow class a bearer belongs to.
pub type Qfi = u8;

/// Logical channel used by D2D short buffer status reports.
pub const D2D_SHORT_BSR_LCID: Lcid = 62;

/// Logical channel used by D2D multicast short buffer status reports.
pub const D2D_MULTI_SHORT_BSR_LCID: Lcid = 63;

/// One uplink or downlink data stream of a node/bearer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId {
    pub node: NodeId,
    pub lcid: Lcid,
}

impl FlowId {
    pub const fn new(node: NodeId, lcid: Lcid) -> Self {
        Self { node, lcid }
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.lcid)
    }
}

/// Direction an allocator instance schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkDirection {
    Uplink,
    #[default]
    Downlink,
}

impl fmt::Display for LinkDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uplink => write!(f, "UL"),
            Self::Downlink => write!(f, "DL"),
        }
    }
}

/// True direction of a flow, including the device-to-device variants that
/// share the uplink resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Uplink,
    Downlink,
    D2d,
    D2dMulti,
}

impl Direction {
    /// Resolve the true direction of `flow` when scheduled on `link`.
    pub fn resolve(link: LinkDirection, flow: FlowId) -> Self {
        match link {
            LinkDirection::Downlink => Self::Downlink,
            LinkDirection::Uplink => match flow.lcid {
                D2D_SHORT_BSR_LCID => Self::D2d,
                D2D_MULTI_SHORT_BSR_LCID => Self::D2dMulti,
                _ => Self::Uplink,
            },
        }
    }

    /// Only plain uplink and downlink flows compete for cellular resources.
    pub fn is_cellular(self) -> bool {
        matches!(self, Self::Uplink | Self::Downlink)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Static QoS parameters of a flow class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QosContext {
    /// Flow class identifier
    pub qfi: Qfi,
    /// Standardized QoS characteristics index
    #[serde(default)]
    pub five_qi: u8,
    /// Priority level, lower is more important
    pub priority_level: u8,
    /// Packet delay budget in milliseconds
    pub delay_budget_ms: u32,
    /// Guaranteed bit rate flow
    #[serde(default)]
    pub is_gbr: bool,
}
