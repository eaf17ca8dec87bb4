//! QoS weight calculation
//!
//! Maps the static QoS attributes of a flow class to a positive scalar. Every
//! factor composes multiplicatively so that one priority step can outweigh
//! any amount of raw backlog under congestion.

use api_types::QosContext;

use crate::config::WeightConfig;

/// Weight returned when a flow has no QoS context.
pub const NEUTRAL_WEIGHT: f64 = 1.0;

/// Pure mapping from QoS context to importance weight.
#[derive(Debug, Clone, Default)]
pub struct QosWeightCalculator {
    cfg: WeightConfig,
}

impl QosWeightCalculator {
    pub fn new(cfg: WeightConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &WeightConfig {
        &self.cfg
    }

    /// Weight of a flow, neutral when no context is known.
    pub fn weight(&self, ctx: Option<&QosContext>) -> f64 {
        match ctx {
            Some(ctx) => self.weight_of(ctx),
            None => NEUTRAL_WEIGHT,
        }
    }

    /// `base^(max_level - level) * delay_bonus * gbr_bonus`, clamped to
    /// `[f64::MIN_POSITIVE, f64::MAX]`.
    pub fn weight_of(&self, ctx: &QosContext) -> f64 {
        let weight = (self.priority_factor(ctx.priority_level)
            * self.delay_factor(ctx.delay_budget_ms)
            * self.gbr_factor(ctx.is_gbr))
        .clamp(f64::MIN_POSITIVE, f64::MAX);

        tracing::trace!(
            qfi = ctx.qfi,
            priority_level = ctx.priority_level,
            delay_budget_ms = ctx.delay_budget_ms,
            is_gbr = ctx.is_gbr,
            weight,
            "computed QoS weight"
        );
        weight
    }

    fn priority_factor(&self, priority_level: u8) -> f64 {
        // levels beyond the configured maximum shrink below 1 but stay positive
        let steps = i32::from(self.cfg.max_priority_level) - i32::from(priority_level);
        self.cfg.priority_base.powi(steps)
    }

    fn delay_factor(&self, delay_budget_ms: u32) -> f64 {
        if delay_budget_ms <= self.cfg.tight_delay_budget_ms {
            self.cfg.tight_delay_multiplier
        } else if delay_budget_ms <= self.cfg.moderate_delay_budget_ms {
            self.cfg.moderate_delay_multiplier
        } else {
            1.0
        }
    }

    fn gbr_factor(&self, is_gbr: bool) -> f64 {
        if is_gbr {
            self.cfg.gbr_multiplier
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(priority_level: u8, delay_budget_ms: u32, is_gbr: bool) -> QosContext {
        QosContext {
            qfi: 1,
            five_qi: 9,
            priority_level,
            delay_budget_ms,
            is_gbr,
        }
    }

    #[test]
    fn urllc_context_matches_reference_weight() {
        let calc = QosWeightCalculator::default();
        // 2^(9-1) * 10 * 2
        assert_eq!(calc.weight_of(&ctx(1, 5, true)), 5120.0);
    }

    #[test]
    fn missing_context_is_neutral() {
        let calc = QosWeightCalculator::default();
        assert_eq!(calc.weight(None), NEUTRAL_WEIGHT);
    }

    #[test]
    fn weight_grows_as_priority_level_drops() {
        let calc = QosWeightCalculator::default();
        let mut previous = 0.0;
        for level in (1..=9).rev() {
            let w = calc.weight_of(&ctx(level, 300, false));
            assert!(w > previous, "level {level} should outweigh level {}", level + 1);
            previous = w;
        }
        assert!(calc.weight_of(&ctx(1, 100, true)) > calc.weight_of(&ctx(9, 100, true)));
    }

    #[test]
    fn delay_budget_steps() {
        let calc = QosWeightCalculator::default();
        let base = calc.weight_of(&ctx(9, 300, false));
        assert_eq!(base, 1.0);
        assert_eq!(calc.weight_of(&ctx(9, 10, false)), 10.0);
        assert_eq!(calc.weight_of(&ctx(9, 11, false)), 3.0);
        assert_eq!(calc.weight_of(&ctx(9, 50, false)), 3.0);
        assert_eq!(calc.weight_of(&ctx(9, 51, false)), 1.0);
    }

    #[test]
    fn factors_compose_multiplicatively() {
        let calc = QosWeightCalculator::default();
        let plain = calc.weight_of(&ctx(5, 300, false));
        let gbr = calc.weight_of(&ctx(5, 300, true));
        let tight_gbr = calc.weight_of(&ctx(5, 5, true));
        assert_eq!(gbr, plain * 2.0);
        assert_eq!(tight_gbr, gbr * 10.0);
    }

    #[test]
    fn level_beyond_maximum_stays_positive() {
        let calc = QosWeightCalculator::default();
        let w = calc.weight_of(&ctx(12, 300, false));
        assert!(w > 0.0 && w < 1.0);
    }

    #[test]
    fn custom_base_widens_separation() {
        let calc = QosWeightCalculator::new(WeightConfig {
            priority_base: 4.0,
            ..Default::default()
        });
        assert_eq!(calc.weight_of(&ctx(7, 300, false)), 16.0);
    }

    #[test]
    fn extreme_base_is_clamped_positive_and_finite() {
        let calc = QosWeightCalculator::new(WeightConfig {
            priority_base: 1e200,
            ..Default::default()
        });
        // 1e200^-6 underflows, 1e200^8 overflows
        assert_eq!(calc.weight_of(&ctx(15, 300, false)), f64::MIN_POSITIVE);
        assert_eq!(calc.weight_of(&ctx(1, 5, true)), f64::MAX);
    }
}
