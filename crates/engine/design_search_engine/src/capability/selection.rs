use std::collections::BTreeSet;

use core_types::{ObjectiveVector, StateId};
use serde::Serialize;

use crate::domain::DesignState;
use crate::engine::pareto::scaled_distance;

/// The states carried into the next depth. Never more than the beam width and
/// never two states with one id.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BeamFrontier {
    states: Vec<DesignState>,
}

impl BeamFrontier {
    pub fn root(state: DesignState) -> Self {
        Self {
            states: vec![state],
        }
    }

    /// Keeps first occurrences in order, stopping at `beam_width`.
    pub fn from_ordered(states: impl IntoIterator<Item = DesignState>, beam_width: usize) -> Self {
        let mut seen = BTreeSet::new();
        let mut out = Vec::with_capacity(beam_width);
        for state in states {
            if out.len() >= beam_width {
                break;
            }
            if seen.insert(state.id) {
                out.push(state);
            }
        }
        Self { states: out }
    }

    pub fn states(&self) -> &[DesignState] {
        &self.states
    }

    pub fn ids(&self) -> Vec<StateId> {
        self.states.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Max-min farthest-point selection blended with pool position.
#[derive(Clone, Copy, Debug)]
pub struct BeamSelector {
    beam_width: usize,
    pool_size: usize,
}

impl BeamSelector {
    pub fn new(beam_width: usize, pool_size: usize) -> Self {
        Self {
            beam_width,
            pool_size: pool_size.max(beam_width),
        }
    }

    /// `order` lists candidate indices best first; `scaled` is indexed by
    /// candidate. Returns chosen candidate indices in pick order.
    ///
    /// The best candidate seeds the beam. Each later pick maximises
    /// `(1 - lambda) * quality + lambda * spread`, where quality falls linearly
    /// with pool position and spread is the min distance to the picks so far
    /// divided by the largest such distance in the pool.
    pub fn select(&self, order: &[usize], scaled: &[ObjectiveVector], lambda: f64) -> Vec<usize> {
        let pool: Vec<usize> = order.iter().copied().take(self.pool_size).collect();
        if pool.is_empty() || self.beam_width == 0 {
            return Vec::new();
        }
        let quality = |pos: usize| {
            if pool.len() <= 1 {
                1.0
            } else {
                1.0 - pos as f64 / (pool.len() - 1) as f64
            }
        };

        let mut used = vec![false; pool.len()];
        let mut min_dist = vec![f64::INFINITY; pool.len()];
        let mut chosen = vec![pool[0]];
        used[0] = true;

        while chosen.len() < self.beam_width.min(pool.len()) {
            let last = scaled[chosen[chosen.len() - 1]];
            for (pos, &cand) in pool.iter().enumerate() {
                if !used[pos] {
                    min_dist[pos] = min_dist[pos].min(scaled_distance(&scaled[cand], &last));
                }
            }
            let max_dmin = (0..pool.len())
                .filter(|p| !used[*p])
                .map(|p| min_dist[p])
                .fold(0.0f64, f64::max);

            let mut best: Option<(usize, f64)> = None;
            for pos in 0..pool.len() {
                if used[pos] {
                    continue;
                }
                let spread = if max_dmin > 0.0 {
                    min_dist[pos] / max_dmin
                } else {
                    0.0
                };
                let value = (1.0 - lambda) * quality(pos) + lambda * spread;
                if best.is_none_or(|(_, v)| value > v) {
                    best = Some((pos, value));
                }
            }
            match best {
                Some((pos, _)) => {
                    used[pos] = true;
                    chosen.push(pool[pos]);
                }
                None => break,
            }
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use core_types::{ObjectiveVector, RuleCategory, RuleId};

    use super::*;

    fn at(x: f64) -> ObjectiveVector {
        ObjectiveVector::from_array([x, 0.0, 0.0, 0.0, 0.0])
    }

    #[test]
    fn zero_lambda_is_pure_quality_order() {
        let scaled = vec![at(0.0), at(0.001), at(5.0), at(0.002)];
        let picks = BeamSelector::new(3, 4).select(&[0, 1, 2, 3], &scaled, 0.0);
        assert_eq!(picks, vec![0, 1, 2]);
    }

    #[test]
    fn full_lambda_spreads_the_beam() {
        let scaled = vec![at(0.0), at(0.001), at(0.002), at(5.0)];
        let picks = BeamSelector::new(2, 4).select(&[0, 1, 2, 3], &scaled, 1.0);
        assert_eq!(picks, vec![0, 3]);
    }

    #[test]
    fn pool_limits_candidates() {
        let scaled = vec![at(0.0), at(0.1), at(9.0)];
        let picks = BeamSelector::new(2, 2).select(&[0, 1, 2], &scaled, 1.0);
        assert_eq!(picks, vec![0, 1]);
    }

    #[test]
    fn frontier_drops_duplicate_ids_and_caps_width() {
        let root = DesignState::root(1, 4, 3);
        let a = root.derive_child(RuleId(1), RuleCategory::Cost, 0, (3, 2, 0));
        let b = root.derive_child(RuleId(2), RuleCategory::Cost, 0, (5, 2, 0));
        let c = root.derive_child(RuleId(3), RuleCategory::Cost, 0, (6, 2, 0));
        let f = BeamFrontier::from_ordered(vec![a.clone(), a.clone(), b.clone(), c], 2);
        assert_eq!(f.ids(), vec![a.id, b.id]);
    }
}
