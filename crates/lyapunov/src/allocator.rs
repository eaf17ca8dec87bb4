//! Drift-minimizing allocator
//!
//! Per slot, every active flow is scored with `backlog * rate * weight` (or
//! its exponentiated form) and flows are granted greedily in descending
//! score order. This is the greedy choice that minimizes the expected
//! one-step drift of the quadratic backlog energy. Flows of the
//! strict-priority class form a tier above all others, ordered among
//! themselves by score.
//!
//! ```plaintext
//! ┌──────────────────┐   snapshot   ┌──────────────┐
//! │ Authoritative    │─────────────▶│ Working copy │
//! │ active set       │              └──────┬───────┘
//! └────────▲─────────┘                     │ gather + score
//!          │                               ▼
//!          │                        ┌──────────────┐
//!          │                        │ Max ordering │
//!          │                        └──────┬───────┘
//!          │                               │ drain: request grants
//!          │          commit (replace)     ▼
//!          └────────────────────────┌──────────────┐
//!                                   │ Slot report  │
//!                                   └──────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use api_types::{Direction, FlowId, LinkDirection};
use error_stack::{report, Result};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::active_set::ActiveSet;
use crate::config::AllocatorConfig;
use crate::environment::{
    ChannelEstimator, GrantExecutor, IdentityResolver, QueueStateProvider, SlotEnvironment,
};
use crate::qos::QosDirectory;
use crate::score::{Ranking, ScoreFunction, ScoreInputs, ScoredFlow};
use crate::weight::QosWeightCalculator;
use crate::SchedulerError;

/// Byte budget of every grant request; the executor caps it to what is left.
pub const UNBOUNDED_GRANT: u64 = u64::MAX;

/// Why a flow did or did not enter the ordering this slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowEvaluation {
    /// Identity could not be resolved; removed for good.
    Departed,
    /// D2D variants do not compete for cellular resources.
    UnsupportedDirection(Direction),
    /// Nothing queued.
    Idle,
    /// No channel quality or band reported yet.
    NoChannel,
    /// All spatial layers of the node already carry a codeword.
    LayersExhausted,
    /// Channel reported but no resource units available.
    ZeroRate,
    /// Entered the ordering with this score.
    Scored(f64),
}

impl FlowEvaluation {
    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Scored(score) => Some(*score),
            _ => None,
        }
    }
}

/// One grant issued while draining the ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grant {
    pub flow: FlowId,
    pub bytes: u64,
    pub score: f64,
}

/// Observable result of one slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotReport {
    /// Evaluation of every flow in the working set, in set order
    pub evaluations: Vec<(FlowId, FlowEvaluation)>,
    /// Ordering before the drain, strict tier first, then highest score
    pub ordering: Vec<ScoredFlow>,
    /// Grants in the order they were issued
    pub grants: Vec<Grant>,
    /// Accumulated bytes per evaluated flow, 0 when not served
    pub granted_bytes: BTreeMap<FlowId, u64>,
    /// Flows removed permanently because their identity did not resolve
    pub departed: Vec<FlowId>,
    /// Flows the executor reported inactive
    pub deactivated: Vec<FlowId>,
    /// The executor reported that no resources are left this slot
    pub terminated_early: bool,
}

impl SlotReport {
    pub fn total_granted(&self) -> u64 {
        self.granted_bytes.values().sum()
    }

    pub fn granted_to(&self, flow: FlowId) -> u64 {
        self.granted_bytes.get(&flow).copied().unwrap_or(0)
    }

    /// Flows in the order they first received a grant.
    pub fn service_order(&self) -> Vec<FlowId> {
        let mut seen = BTreeSet::new();
        self.grants
            .iter()
            .map(|grant| grant.flow)
            .filter(|flow| seen.insert(*flow))
            .collect()
    }
}

/// A prepared but not yet committed slot.
///
/// Dropping it abandons the pass: the authoritative active set keeps every
/// flow except the departed ones.
#[must_use = "a prepared slot must be committed for its removals to take effect"]
#[derive(Debug)]
pub struct SlotSchedule {
    working: ActiveSet,
    report: SlotReport,
}

impl SlotSchedule {
    pub fn report(&self) -> &SlotReport {
        &self.report
    }

    pub fn working_set(&self) -> &ActiveSet {
        &self.working
    }

    /// Replace the authoritative set with the working copy.
    pub fn commit(self, active: &mut ActiveSet) -> SlotReport {
        active.replace(self.working);
        self.report
    }
}

/// Builder for [`DriftAllocator`].
#[derive(Default)]
pub struct DriftAllocatorBuilder {
    qos: Option<Arc<dyn QosDirectory>>,
    config: AllocatorConfig,
}

impl DriftAllocatorBuilder {
    pub fn qos_directory(mut self, qos: Arc<dyn QosDirectory>) -> Self {
        self.qos = Some(qos);
        self
    }

    pub fn config(mut self, config: AllocatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<DriftAllocator, SchedulerError> {
        let qos = self
            .qos
            .ok_or_else(|| report!(SchedulerError::MissingQosDirectory))?;
        self.config.validate()?;

        let rng = match self.config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        tracing::debug!(
            direction = %self.config.direction,
            alpha = self.config.scoring.alpha,
            beta = self.config.scoring.beta,
            priority_base = self.config.weights.priority_base,
            strict_priority_qfi = ?self.config.scoring.strict_priority_qfi,
            "initialized drift allocator"
        );

        Ok(DriftAllocator {
            qos,
            weights: QosWeightCalculator::new(self.config.weights),
            scoring: ScoreFunction::new(self.config.scoring),
            direction: self.config.direction,
            rng,
        })
    }
}

/// Per-slot weighted max-weight scheduler.
pub struct DriftAllocator {
    qos: Arc<dyn QosDirectory>,
    weights: QosWeightCalculator,
    scoring: ScoreFunction,
    direction: LinkDirection,
    rng: SmallRng,
}

impl fmt::Debug for DriftAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriftAllocator")
            .field("qos", &"<directory>")
            .field("weights", &self.weights)
            .field("scoring", &self.scoring)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

struct Gathered {
    ranking: Ranking,
    evaluations: Vec<(FlowId, FlowEvaluation)>,
    departed: Vec<FlowId>,
}

struct Drained {
    grants: Vec<Grant>,
    granted_bytes: BTreeMap<FlowId, u64>,
    deactivated: Vec<FlowId>,
    terminated_early: bool,
}

impl DriftAllocator {
    pub fn builder() -> DriftAllocatorBuilder {
        DriftAllocatorBuilder::default()
    }

    pub fn direction(&self) -> LinkDirection {
        self.direction
    }

    pub fn weights(&self) -> &QosWeightCalculator {
        &self.weights
    }

    pub fn scoring(&self) -> &ScoreFunction {
        &self.scoring
    }

    /// Gather, score and drain one slot without committing it.
    ///
    /// Departed flows leave `active` immediately; all other removals stay in
    /// the returned schedule until [`SlotSchedule::commit`].
    pub fn prepare_schedule<E>(&mut self, active: &mut ActiveSet, env: &mut E) -> SlotSchedule
    where
        E: SlotEnvironment + ?Sized,
    {
        let mut working = active.snapshot();
        let gathered = self.gather(active, &mut working, &*env);
        let ordering = gathered.ranking.ordering();

        let mut granted_bytes: BTreeMap<FlowId, u64> = gathered
            .evaluations
            .iter()
            .filter(|(_, evaluation)| *evaluation != FlowEvaluation::Departed)
            .map(|(flow, _)| (*flow, 0))
            .collect();

        let drained = Self::drain(gathered.ranking, &mut working, env);
        for (flow, bytes) in drained.granted_bytes {
            *granted_bytes.entry(flow).or_default() += bytes;
        }

        tracing::debug!(
            direction = %self.direction,
            evaluated = gathered.evaluations.len(),
            scored = ordering.len(),
            grants = drained.grants.len(),
            departed = gathered.departed.len(),
            deactivated = drained.deactivated.len(),
            terminated_early = drained.terminated_early,
            "prepared slot schedule"
        );

        SlotSchedule {
            working,
            report: SlotReport {
                evaluations: gathered.evaluations,
                ordering,
                grants: drained.grants,
                granted_bytes,
                departed: gathered.departed,
                deactivated: drained.deactivated,
                terminated_early: drained.terminated_early,
            },
        }
    }

    /// Prepare and commit in one go.
    pub fn run_slot<E>(&mut self, active: &mut ActiveSet, env: &mut E) -> SlotReport
    where
        E: SlotEnvironment + ?Sized,
    {
        self.prepare_schedule(active, env).commit(active)
    }

    /// The gather and score step alone, highest score first.
    ///
    /// Departed flows are still removed from `active`.
    pub fn rank<E>(&mut self, active: &mut ActiveSet, env: &E) -> Vec<ScoredFlow>
    where
        E: IdentityResolver + QueueStateProvider + ChannelEstimator + ?Sized,
    {
        let mut working = active.snapshot();
        self.gather(active, &mut working, env).ranking.ordering()
    }

    fn gather<E>(&mut self, active: &mut ActiveSet, working: &mut ActiveSet, env: &E) -> Gathered
    where
        E: IdentityResolver + QueueStateProvider + ChannelEstimator + ?Sized,
    {
        let mut ranking = Ranking::new();
        let mut evaluations = Vec::with_capacity(working.len());
        let mut departed = Vec::new();

        let flows: Vec<FlowId> = working.iter().collect();
        for flow in flows {
            let (evaluation, strict) = self.evaluate(flow, env);
            match evaluation {
                FlowEvaluation::Departed => {
                    active.remove(flow);
                    working.remove(flow);
                    departed.push(flow);
                }
                FlowEvaluation::Scored(score) => ranking.push(ScoredFlow {
                    flow,
                    score,
                    strict,
                }),
                _ => {}
            }
            evaluations.push((flow, evaluation));
        }

        Gathered {
            ranking,
            evaluations,
            departed,
        }
    }

    /// Evaluation of one flow and whether it belongs to the strict tier.
    fn evaluate<E>(&mut self, flow: FlowId, env: &E) -> (FlowEvaluation, bool)
    where
        E: IdentityResolver + QueueStateProvider + ChannelEstimator + ?Sized,
    {
        let Some(identity) = env.resolve_identity(flow) else {
            tracing::debug!(flow = %flow, "identity not resolvable, dropping flow");
            return (FlowEvaluation::Departed, false);
        };

        let direction = Direction::resolve(self.direction, flow);
        if !direction.is_cellular() {
            return (FlowEvaluation::UnsupportedDirection(direction), false);
        }

        let backlog_bytes = env.backlog_bytes(flow, direction);
        if backlog_bytes == 0 {
            return (FlowEvaluation::Idle, false);
        }

        let Some(estimate) = env.estimate(&identity, direction) else {
            tracing::trace!(flow = %flow, "no channel information yet");
            return (FlowEvaluation::NoChannel, false);
        };
        if env.codewords_exhausted(&identity, direction) {
            return (FlowEvaluation::LayersExhausted, false);
        }

        let rate = estimate.bytes_per_unit();
        let ctx = self.qos.qos_context(flow);
        let weight = self.weights.weight(ctx.as_ref());
        let qfi = ctx.map(|ctx| ctx.qfi);
        let base = self.scoring.score(&ScoreInputs {
            backlog_bytes,
            rate,
            weight,
            qfi,
        });
        if base == 0.0 {
            return (FlowEvaluation::ZeroRate, false);
        }

        let score = base + self.scoring.perturbation(&mut self.rng);
        let strict = self.scoring.is_strict_priority(qfi);
        tracing::debug!(
            flow = %flow,
            qfi = ?qfi,
            backlog = backlog_bytes,
            rate,
            weight,
            score,
            strict,
            "scored flow"
        );
        (FlowEvaluation::Scored(score), strict)
    }

    fn drain<X>(mut ranking: Ranking, working: &mut ActiveSet, executor: &mut X) -> Drained
    where
        X: GrantExecutor + ?Sized,
    {
        let mut grants = Vec::new();
        let mut granted_bytes: BTreeMap<FlowId, u64> = BTreeMap::new();
        let mut deactivated = Vec::new();
        let mut terminated_early = false;

        while let Some(head) = ranking.pop() {
            let outcome = executor.request_grant(head.flow, UNBOUNDED_GRANT);
            *granted_bytes.entry(head.flow).or_default() += outcome.granted_bytes;
            grants.push(Grant {
                flow: head.flow,
                bytes: outcome.granted_bytes,
                score: head.score,
            });

            if !outcome.active {
                working.remove(head.flow);
                deactivated.push(head.flow);
            }
            if outcome.terminate {
                terminated_early = true;
                break;
            }
            // an empty grant cannot make progress, so it ends the flow's turn
            if outcome.active && outcome.eligible && outcome.granted_bytes > 0 {
                ranking.push(head);
            }
        }

        Drained {
            grants,
            granted_bytes,
            deactivated,
            terminated_early,
        }
    }
}
