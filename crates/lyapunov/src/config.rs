use api_types::{LinkDirection, Qfi};
use error_stack::{report, Result};

use crate::SchedulerError;

/// Tunables of the QoS weight rule.
///
/// Thresholds and multipliers are operator knobs, not properties of the radio
/// domain; the defaults reproduce the aggressive URLLC-first profile.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightConfig {
    /// Exponential base applied per priority step. Must be greater than 1.
    pub priority_base: f64,
    /// Priority level that maps to `priority_base^0`.
    pub max_priority_level: u8,
    /// Delay budgets at or below this many milliseconds get the tight bonus.
    pub tight_delay_budget_ms: u32,
    pub tight_delay_multiplier: f64,
    /// Delay budgets at or below this many milliseconds get the moderate bonus.
    pub moderate_delay_budget_ms: u32,
    pub moderate_delay_multiplier: f64,
    /// Constant bonus for guaranteed bit rate flows.
    pub gbr_multiplier: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            priority_base: 2.0,
            max_priority_level: 9,
            tight_delay_budget_ms: 10,
            tight_delay_multiplier: 10.0,
            moderate_delay_budget_ms: 50,
            moderate_delay_multiplier: 3.0,
            gbr_multiplier: 2.0,
        }
    }
}

impl WeightConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if !self.priority_base.is_finite() || self.priority_base <= 1.0 {
            return Err(report!(SchedulerError::invalid_config(
                "priority_base must be a finite value greater than 1"
            )));
        }
        if self.moderate_delay_budget_ms < self.tight_delay_budget_ms {
            return Err(report!(SchedulerError::invalid_config(
                "moderate_delay_budget_ms must not be below tight_delay_budget_ms"
            )));
        }
        for (name, value) in [
            ("tight_delay_multiplier", self.tight_delay_multiplier),
            ("moderate_delay_multiplier", self.moderate_delay_multiplier),
            ("gbr_multiplier", self.gbr_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(report!(SchedulerError::invalid_config(format!(
                    "{name} must be a positive finite value"
                ))));
            }
        }
        Ok(())
    }
}

/// Tunables of the composite score `backlog^alpha * rate * weight^beta`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreConfig {
    /// Backlog exponent; higher values react harder to growing queues.
    pub alpha: f64,
    /// Weight exponent; higher values sharpen QoS separation.
    pub beta: f64,
    /// Half-width of the uniform tie-break perturbation. Zero disables it.
    pub score_epsilon: f64,
    /// Flow class that is always drained before weighted competition.
    pub strict_priority_qfi: Option<Qfi>,
    /// Multiplier applied to the full score of the strict-priority class.
    pub strict_priority_multiplier: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            score_epsilon: 1e-6,
            strict_priority_qfi: None,
            strict_priority_multiplier: 1e12,
        }
    }
}

impl ScoreConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(report!(SchedulerError::invalid_config(
                "alpha must be a finite value >= 0"
            )));
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(report!(SchedulerError::invalid_config(
                "beta must be a finite value >= 0"
            )));
        }
        if !self.score_epsilon.is_finite() || self.score_epsilon < 0.0 {
            return Err(report!(SchedulerError::invalid_config(
                "score_epsilon must be a finite value >= 0"
            )));
        }
        if !self.strict_priority_multiplier.is_finite() || self.strict_priority_multiplier < 1.0 {
            return Err(report!(SchedulerError::invalid_config(
                "strict_priority_multiplier must be a finite value >= 1"
            )));
        }
        Ok(())
    }
}

/// Full allocator configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocatorConfig {
    /// Link direction this allocator schedules
    pub direction: LinkDirection,
    pub weights: WeightConfig,
    pub scoring: ScoreConfig,
    /// Seed for the tie-break perturbation; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl AllocatorConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        self.weights.validate()?;
        self.scoring.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AllocatorConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_flat_priority_base() {
        let cfg = WeightConfig {
            priority_base: 1.0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err.current_context(),
            SchedulerError::InvalidConfiguration { reason } if reason.contains("priority_base")
        ));
    }

    #[test]
    fn rejects_negative_exponents() {
        let cfg = ScoreConfig {
            beta: -0.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ScoreConfig {
            alpha: f64::NAN,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_shrinking_strict_priority_multiplier() {
        let cfg = ScoreConfig {
            strict_priority_multiplier: 0.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_delay_thresholds() {
        let cfg = WeightConfig {
            tight_delay_budget_ms: 60,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_epsilon_is_allowed() {
        let cfg = ScoreConfig {
            score_epsilon: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
