use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;

use api_types::{Direction, FlowId, QosContext};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lyapunov::{
    ActiveSet, AllocatorConfig, ChannelEstimator, DriftAllocator, GrantExecutor, GrantOutcome,
    IdentityResolver, NetworkIdentity, QueueStateProvider, ResourceEstimate, StaticQosDirectory,
};

struct BenchCell {
    backlog: HashMap<FlowId, u64>,
    units_left: u32,
}

impl IdentityResolver for BenchCell {
    fn resolve_identity(&self, flow: FlowId) -> Option<NetworkIdentity> {
        Some(NetworkIdentity {
            node: flow.node,
            handle: u64::from(flow.node) + 1,
        })
    }
}

impl QueueStateProvider for BenchCell {
    fn backlog_bytes(&self, flow: FlowId, _direction: Direction) -> u64 {
        self.backlog.get(&flow).copied().unwrap_or(0)
    }
}

impl ChannelEstimator for BenchCell {
    fn estimate(&self, identity: &NetworkIdentity, _direction: Direction) -> Option<ResourceEstimate> {
        let bytes_per_unit = 20 + u64::from(identity.node % 60);
        Some(ResourceEstimate::new(
            self.units_left,
            u64::from(self.units_left) * bytes_per_unit,
        ))
    }
}

impl GrantExecutor for BenchCell {
    fn request_grant(&mut self, _flow: FlowId, _max_bytes: u64) -> GrantOutcome {
        let units = self.units_left.min(4);
        self.units_left -= units;
        GrantOutcome {
            granted_bytes: u64::from(units) * 40,
            terminate: self.units_left == 0,
            active: true,
            eligible: false,
        }
    }
}

fn slot_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot_pass");
    for flows in [16u16, 128, 1024] {
        let mut qos = StaticQosDirectory::new();
        for qfi in 1..=9u8 {
            qos.insert_context(QosContext {
                qfi,
                five_qi: qfi,
                priority_level: qfi,
                delay_budget_ms: u32::from(qfi) * 20,
                is_gbr: qfi < 4,
            });
        }
        let ids: Vec<FlowId> = (0..flows).map(|node| FlowId::new(node, 1)).collect();
        for id in &ids {
            qos.bind_flow(*id, (id.node % 9) as u8 + 1);
        }
        let mut alloc = DriftAllocator::builder()
            .qos_directory(Arc::new(qos))
            .config(AllocatorConfig {
                seed: Some(1),
                ..Default::default()
            })
            .build()
            .expect("valid allocator");

        group.bench_with_input(BenchmarkId::from_parameter(flows), &ids, |b, ids| {
            b.iter(|| {
                let mut cell = BenchCell {
                    backlog: ids
                        .iter()
                        .map(|id| (*id, 100 + u64::from(id.node) * 13 % 5000))
                        .collect(),
                    units_left: 273,
                };
                let mut active: ActiveSet = ids.iter().copied().collect();
                black_box(alloc.run_slot(&mut active, &mut cell))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, slot_pass);
criterion_main!(benches);
