use std::collections::BTreeSet;

use api_types::FlowId;

/// Flows eligible for scheduling.
///
/// The surrounding framework owns and grows it; a slot pass only shrinks it,
/// through a working copy that replaces the original on commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSet {
    flows: BTreeSet<FlowId>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the flow was already active.
    pub fn insert(&mut self, flow: FlowId) -> bool {
        self.flows.insert(flow)
    }

    pub fn remove(&mut self, flow: FlowId) -> bool {
        self.flows.remove(&flow)
    }

    pub fn contains(&self, flow: FlowId) -> bool {
        self.flows.contains(&flow)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FlowId> + '_ {
        self.flows.iter().copied()
    }

    pub fn is_subset(&self, other: &ActiveSet) -> bool {
        self.flows.is_subset(&other.flows)
    }

    /// Private copy for a slot pass.
    pub fn snapshot(&self) -> ActiveSet {
        self.clone()
    }

    /// Replace the contents with a committed working copy.
    pub fn replace(&mut self, committed: ActiveSet) {
        *self = committed;
    }
}

impl FromIterator<FlowId> for ActiveSet {
    fn from_iter<T: IntoIterator<Item = FlowId>>(iter: T) -> Self {
        Self {
            flows: iter.into_iter().collect(),
        }
    }
}

impl Extend<FlowId> for ActiveSet {
    fn extend<T: IntoIterator<Item = FlowId>>(&mut self, iter: T) {
        self.flows.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_isolated_until_replace() {
        let mut active: ActiveSet = [FlowId::new(1, 1), FlowId::new(2, 1)].into_iter().collect();
        let mut working = active.snapshot();
        working.remove(FlowId::new(1, 1));

        assert!(active.contains(FlowId::new(1, 1)));
        assert!(working.is_subset(&active));

        active.replace(working);
        assert!(!active.contains(FlowId::new(1, 1)));
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn no_duplicates() {
        let mut active = ActiveSet::new();
        assert!(active.insert(FlowId::new(1, 1)));
        assert!(!active.insert(FlowId::new(1, 1)));
        assert_eq!(active.len(), 1);
    }
}
