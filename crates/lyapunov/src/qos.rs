//! QoS context directory

use std::collections::HashMap;

use api_types::{FlowId, QosContext, Qfi};

/// Lookup of the static QoS context of a flow.
///
/// Absence is a valid answer: flows without a registered class are scheduled
/// with a neutral weight.
pub trait QosDirectory: Send + Sync {
    fn qos_context(&self, flow: FlowId) -> Option<QosContext>;
}

/// In-memory directory: flow -> QFI, then QFI -> context.
#[derive(Debug, Clone, Default)]
pub struct StaticQosDirectory {
    flow_classes: HashMap<FlowId, Qfi>,
    contexts: HashMap<Qfi, QosContext>,
}

impl StaticQosDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the context of a flow class.
    pub fn insert_context(&mut self, ctx: QosContext) -> Option<QosContext> {
        self.contexts.insert(ctx.qfi, ctx)
    }

    /// Bind a flow to a flow class.
    pub fn bind_flow(&mut self, flow: FlowId, qfi: Qfi) -> Option<Qfi> {
        self.flow_classes.insert(flow, qfi)
    }

    pub fn qfi_for_flow(&self, flow: FlowId) -> Option<Qfi> {
        self.flow_classes.get(&flow).copied()
    }

    pub fn context_by_qfi(&self, qfi: Qfi) -> Option<&QosContext> {
        self.contexts.get(&qfi)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl QosDirectory for StaticQosDirectory {
    fn qos_context(&self, flow: FlowId) -> Option<QosContext> {
        let Some(qfi) = self.qfi_for_flow(flow) else {
            tracing::warn!(flow = %flow, "no QFI registered for flow");
            return None;
        };
        self.context_by_qfi(qfi).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn urllc() -> QosContext {
        QosContext {
            qfi: 4,
            five_qi: 82,
            priority_level: 1,
            delay_budget_ms: 5,
            is_gbr: true,
        }
    }

    #[test]
    fn resolves_through_flow_class() {
        let mut dir = StaticQosDirectory::new();
        dir.insert_context(urllc());
        dir.bind_flow(FlowId::new(3, 1), 4);

        assert_eq!(dir.qos_context(FlowId::new(3, 1)), Some(urllc()));
    }

    #[test]
    fn unbound_flow_has_no_context() {
        let mut dir = StaticQosDirectory::new();
        dir.insert_context(urllc());
        assert_eq!(dir.qos_context(FlowId::new(3, 1)), None);
    }

    #[test]
    fn bound_flow_with_unknown_class_has_no_context() {
        let mut dir = StaticQosDirectory::new();
        dir.bind_flow(FlowId::new(3, 1), 9);
        assert_eq!(dir.qos_context(FlowId::new(3, 1)), None);
        assert!(dir.is_empty());
    }
}
