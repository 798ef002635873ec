use std::collections::BTreeMap;

use core_types::RuleCategory;
use serde::Serialize;

use crate::config::RunConfig;
use crate::domain::DesignState;
use crate::engine::statistics::shannon_entropy_from_counts;

/// Diversity pressure carried between depths. `value` is the smoothed
/// accumulator itself.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LambdaState {
    pub value: f64,
    pub last_delta: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LambdaController {
    pub min: f64,
    pub max: f64,
    pub target_entropy: f64,
    pub k: f64,
    pub ema: f64,
}

impl LambdaController {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            min: config.lambda_min,
            max: config.lambda_max,
            target_entropy: config.lambda_target_entropy,
            k: config.lambda_k,
            ema: config.lambda_ema,
        }
    }

    pub fn initial_state(&self, init: f64) -> LambdaState {
        LambdaState {
            value: init,
            last_delta: 0.0,
        }
    }

    /// `lambda' = clamp(lambda + k * (H_target - H), min, max)`, then
    /// `lambda = (1 - ema) * lambda + ema * lambda'`. Returns the delta.
    pub fn update(&self, state: &mut LambdaState, observed_entropy: f64) -> f64 {
        let e = self.target_entropy - observed_entropy;
        let proposed = (state.value + self.k * e).clamp(self.min, self.max);
        let next = ((1.0 - self.ema) * state.value + self.ema * proposed).clamp(self.min, self.max);
        let delta = next - state.value;
        state.value = next;
        state.last_delta = delta;
        delta
    }
}

/// Origin-category counts of a frontier and their Shannon entropy.
pub fn frontier_category_entropy(frontier: &[DesignState]) -> (f64, BTreeMap<RuleCategory, usize>) {
    let mut counts: BTreeMap<RuleCategory, usize> = BTreeMap::new();
    for state in frontier {
        if let Some(category) = state.origin {
            *counts.entry(category).or_insert(0) += 1;
        }
    }
    (shannon_entropy_from_counts(&counts), counts)
}

/// `"Structural:2|Cost:1"`, in category declaration order.
pub fn format_category_counts(counts: &BTreeMap<RuleCategory, usize>) -> String {
    counts
        .iter()
        .map(|(c, n)| format!("{}:{n}", c.name()))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn controller() -> LambdaController {
        LambdaController {
            min: 0.05,
            max: 1.0,
            target_entropy: 1.0,
            k: 0.05,
            ema: 0.2,
        }
    }

    #[test]
    fn low_entropy_raises_lambda() {
        let c = controller();
        let mut s = c.initial_state(0.5);
        let delta = c.update(&mut s, 0.0);
        assert!(delta > 0.0);
        assert!((s.value - (0.8 * 0.5 + 0.2 * 0.55)).abs() < 1e-12);
    }

    #[test]
    fn high_entropy_lowers_lambda() {
        let c = controller();
        let mut s = c.initial_state(0.5);
        assert!(c.update(&mut s, 2.0) < 0.0);
    }

    #[test]
    fn counts_format_in_category_order() {
        let mut counts = BTreeMap::new();
        counts.insert(RuleCategory::Cost, 1);
        counts.insert(RuleCategory::Structural, 2);
        assert_eq!(format_category_counts(&counts), "Structural:2|Cost:1");
    }

    proptest! {
        #[test]
        fn lambda_stays_in_bounds(
            init in 0.05f64..=1.0,
            entropies in proptest::collection::vec(0.0f64..5.0, 1..50),
        ) {
            let c = controller();
            let mut s = c.initial_state(init);
            for h in entropies {
                c.update(&mut s, h);
                prop_assert!(s.value >= c.min && s.value <= c.max, "lambda={}", s.value);
            }
        }
    }
}
