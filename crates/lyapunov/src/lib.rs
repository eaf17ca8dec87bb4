//! Lyapunov drift-minimizing resource allocator for a cellular base station.
//!
//! This crate provides two main components:
//! - [`QosWeightCalculator`]: maps static QoS attributes to an importance weight
//! - [`DriftAllocator`]: per-slot scheduler granting resources in descending
//!   `backlog^alpha * rate * weight^beta` order
//!
//! Everything the allocator needs from the cell (identities, queue backlog,
//! channel estimates, grant execution) is consumed through the traits in
//! [`environment`], and QoS contexts come from an injected [`QosDirectory`].

use error_stack::Report;

pub mod active_set;
pub mod allocator;
pub mod config;
pub mod environment;
mod error;
pub mod qos;
pub mod score;
pub mod weight;

/// Result type using error-stack for context-rich error reporting
pub type Result<T, C> = core::result::Result<T, Report<C>>;

pub use active_set::ActiveSet;
pub use allocator::{
    DriftAllocator, DriftAllocatorBuilder, FlowEvaluation, Grant, SlotReport, SlotSchedule,
    UNBOUNDED_GRANT,
};
pub use config::{AllocatorConfig, ScoreConfig, WeightConfig};
pub use environment::{
    ChannelEstimator, GrantExecutor, GrantOutcome, IdentityResolver, NetworkIdentity,
    QueueStateProvider, ResourceEstimate, SlotEnvironment,
};
pub use error::SchedulerError;
pub use qos::{QosDirectory, StaticQosDirectory};
pub use score::{ScoreFunction, ScoredFlow};
pub use weight::{QosWeightCalculator, NEUTRAL_WEIGHT};
