//! Scenario files: cell shape, allocator tunables, QoS classes and traffic.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use api_types::{FlowId, Lcid, LinkDirection, NodeId, Qfi, QosContext};
use lyapunov::{AllocatorConfig, ScoreConfig, StaticQosDirectory, WeightConfig};
use serde::{Deserialize, Deserializer};

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid scenario: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub cell: CellParams,
    #[serde(default)]
    pub scheduler: SchedulerParams,
    /// Seed for the score perturbation; the CLI flag wins over it.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub qos_classes: Vec<QosContext>,
    pub flows: Vec<FlowParams>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellParams {
    #[serde(default)]
    pub direction: LinkDirection,
    pub resource_units_per_slot: u32,
    #[serde(default = "default_slot_duration_us")]
    pub slot_duration_us: u64,
}

fn default_slot_duration_us() -> u64 {
    1000
}

/// Allocator tunables as they appear in a scenario file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerParams {
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub alpha: f64,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub beta: f64,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub score_epsilon: f64,

    pub strict_priority_qfi: Option<Qfi>,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub strict_priority_multiplier: f64,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub priority_base: f64,

    pub max_priority_level: u8,

    pub tight_delay_budget_ms: u32,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub tight_delay_multiplier: f64,

    pub moderate_delay_budget_ms: u32,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub moderate_delay_multiplier: f64,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub gbr_multiplier: f64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        let weights = WeightConfig::default();
        let scoring = ScoreConfig::default();
        Self {
            alpha: scoring.alpha,
            beta: scoring.beta,
            score_epsilon: scoring.score_epsilon,
            strict_priority_qfi: scoring.strict_priority_qfi,
            strict_priority_multiplier: scoring.strict_priority_multiplier,
            priority_base: weights.priority_base,
            max_priority_level: weights.max_priority_level,
            tight_delay_budget_ms: weights.tight_delay_budget_ms,
            tight_delay_multiplier: weights.tight_delay_multiplier,
            moderate_delay_budget_ms: weights.moderate_delay_budget_ms,
            moderate_delay_multiplier: weights.moderate_delay_multiplier,
            gbr_multiplier: weights.gbr_multiplier,
        }
    }
}

/// Custom deserializer for f64 that accepts both string and number formats
fn deserialize_f64_from_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
    }

    match StringOrFloat::deserialize(deserializer)? {
        StringOrFloat::String(s) => s.parse::<f64>().map_err(|e| {
            serde::de::Error::custom(format!("Failed to parse float from string '{s}': {e}"))
        }),
        StringOrFloat::Float(f) => Ok(f),
    }
}

/// One logical channel of one node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowParams {
    pub node: NodeId,
    pub lcid: Lcid,
    /// QoS class; unbound flows get the neutral weight.
    #[serde(default)]
    pub qfi: Option<Qfi>,
    /// Bytes one resource unit carries for this node. Absent means no channel
    /// report ever arrives.
    #[serde(default)]
    pub bytes_per_unit: Option<u64>,
    /// First slot with a usable channel report.
    #[serde(default)]
    pub channel_from_slot: u64,
    #[serde(default)]
    pub initial_backlog: u64,
    #[serde(default)]
    pub arrival_bytes_per_slot: u64,
    /// Slot at which the node leaves the cell.
    #[serde(default)]
    pub depart_at_slot: Option<u64>,
}

impl FlowParams {
    pub fn id(&self) -> FlowId {
        FlowId::new(self.node, self.lcid)
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario = Self::from_yaml(&raw)?;
        tracing::debug!(
            path = %path.display(),
            flows = scenario.flows.len(),
            classes = scenario.qos_classes.len(),
            "loaded scenario"
        );
        Ok(scenario)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_yaml::from_str(raw)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Structural checks. Tunable ranges are checked by the allocator builder.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.cell.resource_units_per_slot == 0 {
            return Err(ScenarioError::Invalid(
                "cell.resourceUnitsPerSlot must be greater than 0".to_string(),
            ));
        }
        if self.cell.slot_duration_us == 0 {
            return Err(ScenarioError::Invalid(
                "cell.slotDurationUs must be greater than 0".to_string(),
            ));
        }
        if self.flows.is_empty() {
            return Err(ScenarioError::Invalid("no flows defined".to_string()));
        }

        let mut classes = BTreeSet::new();
        for class in &self.qos_classes {
            if !classes.insert(class.qfi) {
                return Err(ScenarioError::Invalid(format!(
                    "QoS class {} defined twice",
                    class.qfi
                )));
            }
        }

        let mut seen = BTreeSet::new();
        let mut channels: BTreeMap<NodeId, (Option<u64>, u64)> = BTreeMap::new();
        for flow in &self.flows {
            let id = flow.id();
            if !seen.insert(id) {
                return Err(ScenarioError::Invalid(format!("flow {id} defined twice")));
            }
            if let Some(qfi) = flow.qfi {
                if !classes.contains(&qfi) {
                    return Err(ScenarioError::Invalid(format!(
                        "flow {id} references unknown QoS class {qfi}"
                    )));
                }
            }
            if flow.bytes_per_unit == Some(0) {
                return Err(ScenarioError::Invalid(format!(
                    "flow {id}: bytesPerUnit must be greater than 0"
                )));
            }
            let channel = (flow.bytes_per_unit, flow.channel_from_slot);
            if let Some(existing) = channels.insert(flow.node, channel) {
                if existing != channel {
                    return Err(ScenarioError::Invalid(format!(
                        "node {} has conflicting channel settings",
                        flow.node
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn allocator_config(&self, seed_override: Option<u64>) -> AllocatorConfig {
        let params = &self.scheduler;
        AllocatorConfig {
            direction: self.cell.direction,
            weights: WeightConfig {
                priority_base: params.priority_base,
                max_priority_level: params.max_priority_level,
                tight_delay_budget_ms: params.tight_delay_budget_ms,
                tight_delay_multiplier: params.tight_delay_multiplier,
                moderate_delay_budget_ms: params.moderate_delay_budget_ms,
                moderate_delay_multiplier: params.moderate_delay_multiplier,
                gbr_multiplier: params.gbr_multiplier,
            },
            scoring: ScoreConfig {
                alpha: params.alpha,
                beta: params.beta,
                score_epsilon: params.score_epsilon,
                strict_priority_qfi: params.strict_priority_qfi,
                strict_priority_multiplier: params.strict_priority_multiplier,
            },
            seed: seed_override.or(self.seed),
        }
    }

    pub fn qos_directory(&self) -> StaticQosDirectory {
        let mut directory = StaticQosDirectory::new();
        for class in &self.qos_classes {
            directory.insert_context(*class);
        }
        for flow in &self.flows {
            if let Some(qfi) = flow.qfi {
                directory.bind_flow(flow.id(), qfi);
            }
        }
        directory
    }
}
