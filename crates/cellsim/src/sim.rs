use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use api_types::FlowId;
use lyapunov::{ActiveSet, DriftAllocator, SchedulerError, SlotReport};

use crate::cell::SimulatedCell;
use crate::metrics::encoders::SlotCounters;
use crate::metrics::SlotRecorder;
use crate::scenario::Scenario;

/// Totals of one flow over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowTotals {
    pub granted_bytes: u64,
    pub grants: u64,
    pub slots_served: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub slots: u64,
    pub granted_bytes: u64,
    pub grants: u64,
    pub exhausted_slots: u64,
    pub departed: Vec<FlowId>,
    pub flows: BTreeMap<FlowId, FlowTotals>,
    pub final_backlog: BTreeMap<FlowId, u64>,
}

impl RunSummary {
    pub fn log(&self) {
        tracing::info!(
            slots = self.slots,
            granted_bytes = self.granted_bytes,
            grants = self.grants,
            exhausted_slots = self.exhausted_slots,
            departed = self.departed.len(),
            "run finished"
        );
        for (flow, totals) in &self.flows {
            tracing::info!(
                flow = %flow,
                granted_bytes = totals.granted_bytes,
                grants = totals.grants,
                slots_served = totals.slots_served,
                backlog = self.final_backlog.get(flow).copied().unwrap_or(0),
                "flow totals"
            );
        }
    }
}

/// Drives one allocator over one simulated cell, slot by slot.
///
/// The simulation plays the surrounding framework: it owns the authoritative
/// active set and re-activates flows when new data arrives.
pub struct Simulation {
    cell: SimulatedCell,
    allocator: DriftAllocator,
    active: ActiveSet,
    recorder: Option<SlotRecorder>,
    next_slot: u64,
    totals: BTreeMap<FlowId, FlowTotals>,
    departed: BTreeSet<FlowId>,
    granted_bytes: u64,
    grants: u64,
    exhausted_slots: u64,
}

impl Simulation {
    pub fn new(
        scenario: &Scenario,
        seed: Option<u64>,
        recorder: Option<SlotRecorder>,
    ) -> lyapunov::Result<Self, SchedulerError> {
        let allocator = DriftAllocator::builder()
            .qos_directory(Arc::new(scenario.qos_directory()))
            .config(scenario.allocator_config(seed))
            .build()?;
        let cell = SimulatedCell::from_scenario(scenario);
        let totals = cell.flow_ids().map(|id| (id, FlowTotals::default())).collect();

        Ok(Self {
            cell,
            allocator,
            active: ActiveSet::new(),
            recorder,
            next_slot: 0,
            totals,
            departed: BTreeSet::new(),
            granted_bytes: 0,
            grants: 0,
            exhausted_slots: 0,
        })
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    /// Run the next slot and return its report.
    pub fn step(&mut self) -> SlotReport {
        let slot = self.next_slot;
        self.next_slot += 1;

        let arrivals = self.cell.begin_slot(slot);
        self.active.extend(arrivals);

        let schedule = self.allocator.prepare_schedule(&mut self.active, &mut self.cell);
        let report = schedule.commit(&mut self.active);

        let counters = SlotCounters {
            slot,
            evaluated: report.evaluations.len() as u64,
            scored: report.ordering.len() as u64,
            grants: report.grants.len() as u64,
            granted_bytes: report.total_granted(),
            departed: report.departed.len() as u64,
            deactivated: report.deactivated.len() as u64,
            active_flows: self.active.len() as u64,
            units_left: u64::from(self.cell.units_left()),
            terminated_early: report.terminated_early,
        };
        if let Some(recorder) = &self.recorder {
            recorder.record(&counters, &report);
        }
        self.accumulate(&report);

        tracing::debug!(
            slot,
            grants = counters.grants,
            granted_bytes = counters.granted_bytes,
            active = counters.active_flows,
            "slot done"
        );
        report
    }

    pub fn run(&mut self, slots: u64) -> RunSummary {
        for _ in 0..slots {
            self.step();
        }
        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            slots: self.next_slot,
            granted_bytes: self.granted_bytes,
            grants: self.grants,
            exhausted_slots: self.exhausted_slots,
            departed: self.departed.iter().copied().collect(),
            flows: self.totals.clone(),
            final_backlog: self
                .cell
                .flow_ids()
                .map(|id| (id, self.cell.backlog(id)))
                .collect(),
        }
    }

    fn accumulate(&mut self, report: &SlotReport) {
        for grant in &report.grants {
            let totals = self.totals.entry(grant.flow).or_default();
            totals.granted_bytes += grant.bytes;
            totals.grants += 1;
        }
        for (flow, bytes) in &report.granted_bytes {
            if *bytes > 0 {
                self.totals.entry(*flow).or_default().slots_served += 1;
            }
        }
        self.departed.extend(report.departed.iter().copied());
        self.granted_bytes += report.total_granted();
        self.grants += report.grants.len() as u64;
        if report.terminated_early {
            self.exhausted_slots += 1;
        }
    }
}
