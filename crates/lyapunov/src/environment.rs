use api_types::{Direction, FlowId, NodeId};

/// Network identity a flow resolves to while its user is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkIdentity {
    pub node: NodeId,
    /// Handle of the attached user in the surrounding framework, never 0.
    pub handle: u64,
}

/// Resource units and deliverable bytes for one node over all bands and antennas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceEstimate {
    pub units: u32,
    pub bytes: u64,
}

impl ResourceEstimate {
    pub fn new(units: u32, bytes: u64) -> Self {
        Self { units, bytes }
    }

    /// Bytes deliverable per resource unit, 0 without units.
    pub fn bytes_per_unit(&self) -> f64 {
        if self.units == 0 {
            0.0
        } else {
            self.bytes as f64 / f64::from(self.units)
        }
    }
}

/// Result of a single grant request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantOutcome {
    pub granted_bytes: u64,
    /// No resources are left this slot.
    pub terminate: bool,
    /// The flow is still active; `false` removes it from the active set.
    pub active: bool,
    /// The flow can receive more this slot.
    pub eligible: bool,
}

impl GrantOutcome {
    pub fn new(granted_bytes: u64) -> Self {
        Self {
            granted_bytes,
            terminate: false,
            active: true,
            eligible: true,
        }
    }
}

/// Maps a flow to the identity of its attached user.
pub trait IdentityResolver {
    /// `None` means the user departed.
    fn resolve_identity(&self, flow: FlowId) -> Option<NetworkIdentity>;
}

/// Queue backlog per flow and direction.
pub trait QueueStateProvider {
    fn backlog_bytes(&self, flow: FlowId, direction: Direction) -> u64;
}

/// Channel quality driven resource estimate.
pub trait ChannelEstimator {
    /// `None` while no channel quality or no band has been reported yet.
    fn estimate(&self, identity: &NetworkIdentity, direction: Direction)
        -> Option<ResourceEstimate>;

    /// Every spatial layer of the node already carries a codeword this slot.
    fn codewords_exhausted(&self, _identity: &NetworkIdentity, _direction: Direction) -> bool {
        false
    }
}

/// Performs the actual allocation.
pub trait GrantExecutor {
    /// Grant at most `max_bytes` to `flow`, capped by the resources left.
    fn request_grant(&mut self, flow: FlowId, max_bytes: u64) -> GrantOutcome;
}

/// Everything a slot pass needs from the surrounding cell.
pub trait SlotEnvironment:
    IdentityResolver + QueueStateProvider + ChannelEstimator + GrantExecutor
{
}

impl<T> SlotEnvironment for T where
    T: IdentityResolver + QueueStateProvider + ChannelEstimator + GrantExecutor + ?Sized
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_zero_without_units() {
        assert_eq!(ResourceEstimate::new(0, 500).bytes_per_unit(), 0.0);
        assert_eq!(ResourceEstimate::new(4, 500).bytes_per_unit(), 125.0);
    }
}
