//! Composite drift score and the per-slot max ordering

use std::cmp::Ordering;

use api_types::{FlowId, Qfi};
use priority_queue::PriorityQueue;
use rand::Rng;

use crate::config::ScoreConfig;

/// Total-ordered ranking key: the strict-priority tier first, then the score.
#[derive(Debug, Clone, Copy)]
pub struct Score {
    pub strict: bool,
    pub value: f64,
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.strict
            .cmp(&other.strict)
            .then_with(|| self.value.total_cmp(&other.value))
    }
}

/// A flow and its score for the current slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredFlow {
    pub flow: FlowId,
    pub score: f64,
    /// Member of the strict-priority class, ranked above every other flow
    pub strict: bool,
}

impl ScoredFlow {
    fn key(&self) -> Score {
        Score {
            strict: self.strict,
            value: self.score,
        }
    }

    fn from_entry(flow: FlowId, key: Score) -> Self {
        Self {
            flow,
            score: key.value,
            strict: key.strict,
        }
    }
}

/// Per-flow inputs of the score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    pub backlog_bytes: u64,
    /// Bytes per resource unit
    pub rate: f64,
    pub weight: f64,
    pub qfi: Option<Qfi>,
}

/// Unified scoring rule.
///
/// `backlog^alpha * rate * weight^beta`, multiplied afterwards by the strict
/// priority multiplier for the strict class. With `alpha = beta = 1` this is
/// the linear max-weight rule.
#[derive(Debug, Clone, Default)]
pub struct ScoreFunction {
    cfg: ScoreConfig,
}

impl ScoreFunction {
    pub fn new(cfg: ScoreConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.cfg
    }

    /// Deterministic part of the score; 0 excludes the flow from the ordering.
    ///
    /// Any flow with backlog and a positive rate scores within
    /// `[f64::MIN_POSITIVE, f64::MAX]`.
    pub fn score(&self, inputs: &ScoreInputs) -> f64 {
        if inputs.backlog_bytes == 0 || inputs.rate <= 0.0 || !inputs.rate.is_finite() {
            return 0.0;
        }

        let mut score = (inputs.backlog_bytes as f64).powf(self.cfg.alpha)
            * inputs.rate
            * inputs.weight.powf(self.cfg.beta);
        if self.is_strict_priority(inputs.qfi) {
            score *= self.cfg.strict_priority_multiplier;
        }

        if score.is_nan() || score > f64::MAX {
            tracing::warn!(
                backlog = inputs.backlog_bytes,
                rate = inputs.rate,
                weight = inputs.weight,
                alpha = self.cfg.alpha,
                beta = self.cfg.beta,
                "score overflowed, saturating"
            );
            return f64::MAX;
        }
        score.max(f64::MIN_POSITIVE)
    }

    pub fn is_strict_priority(&self, qfi: Option<Qfi>) -> bool {
        matches!(
            (self.cfg.strict_priority_qfi, qfi),
            (Some(strict), Some(qfi)) if strict == qfi
        )
    }

    /// Uniform tie-break noise in `[-score_epsilon, score_epsilon]`.
    pub fn perturbation<R: Rng>(&self, rng: &mut R) -> f64 {
        let eps = self.cfg.score_epsilon;
        if eps > 0.0 {
            rng.random_range(-eps..=eps)
        } else {
            0.0
        }
    }
}

/// Max ordering of the scored flows of one pass, drained destructively.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    queue: PriorityQueue<FlowId, Score>,
}

impl Ranking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scored: ScoredFlow) {
        self.queue.push(scored.flow, scored.key());
    }

    pub fn pop(&mut self) -> Option<ScoredFlow> {
        self.queue.pop().map(|(flow, key)| ScoredFlow::from_entry(flow, key))
    }

    pub fn peek(&self) -> Option<ScoredFlow> {
        self.queue
            .peek()
            .map(|(flow, key)| ScoredFlow::from_entry(*flow, *key))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Strict-priority flows first, then highest score, without consuming
    /// the ranking.
    pub fn ordering(&self) -> Vec<ScoredFlow> {
        let mut queue = self.queue.clone();
        std::iter::from_fn(move || queue.pop())
            .map(|(flow, key)| ScoredFlow::from_entry(flow, key))
            .collect()
    }
}
