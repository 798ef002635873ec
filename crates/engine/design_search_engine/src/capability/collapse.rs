use std::collections::VecDeque;

use core_types::ObjectiveVector;
use serde::Serialize;

use crate::engine::pareto::mean_nn_dist;
use crate::engine::statistics::median;

pub const COLLAPSE_RATIO: f64 = 0.01;
pub const LEGACY_COLLAPSE_THRESHOLD: f64 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CollapseVerdict {
    /// `D(d)`: mean nearest-neighbour distance of the frontier.
    pub nn_dist: f64,
    /// `D_med`: median of positive `D` over the trailing window, this depth excluded.
    pub reference: f64,
    pub collapse: bool,
    pub legacy_collapse: bool,
}

/// Observes chosen frontiers. Holds only its own history of `D`.
#[derive(Clone, Debug)]
pub struct CollapseDetector {
    window: usize,
    legacy: bool,
    history: VecDeque<f64>,
}

impl CollapseDetector {
    pub fn new(window: usize, legacy: bool) -> Self {
        Self {
            window: window.max(1),
            legacy,
            history: VecDeque::new(),
        }
    }

    pub fn reference(&self) -> f64 {
        median(self.history.iter().copied().filter(|d| *d > 0.0).collect())
    }

    /// Flags `D(d) < 0.01 * D_med` when the frontier holds at least two
    /// rank-0 members, then records `D(d)`.
    pub fn observe(
        &mut self,
        frontier_scaled: &[ObjectiveVector],
        pareto_front_size: usize,
    ) -> CollapseVerdict {
        let nn_dist = mean_nn_dist(frontier_scaled);
        let reference = self.reference();
        let collapse =
            reference > 0.0 && pareto_front_size >= 2 && nn_dist < COLLAPSE_RATIO * reference;
        let legacy_collapse =
            self.legacy && frontier_scaled.len() >= 2 && nn_dist < LEGACY_COLLAPSE_THRESHOLD;

        self.history.push_back(nn_dist);
        while self.history.len() > self.window {
            self.history.pop_front();
        }
        CollapseVerdict {
            nn_dist,
            reference,
            collapse,
            legacy_collapse,
        }
    }
}

#[cfg(test)]
mod tests {
    use core_types::ObjectiveVector;

    use super::*;

    fn frontier(points: &[f64]) -> Vec<ObjectiveVector> {
        points
            .iter()
            .map(|x| ObjectiveVector::from_array([*x, -*x, 0.0, 0.0, 0.0]))
            .collect()
    }

    #[test]
    fn tight_frontier_after_spread_history_collapses() {
        let mut d = CollapseDetector::new(10, false);
        for _ in 0..3 {
            assert!(!d.observe(&frontier(&[0.0, 2.0, 4.0]), 3).collapse);
        }
        let v = d.observe(&frontier(&[1.0, 1.0005, 1.001]), 2);
        assert!(v.collapse, "nn={} ref={}", v.nn_dist, v.reference);
    }

    #[test]
    fn spread_frontier_does_not_collapse() {
        let mut d = CollapseDetector::new(10, false);
        for _ in 0..3 {
            d.observe(&frontier(&[0.0, 2.0, 4.0]), 3);
        }
        assert!(!d.observe(&frontier(&[0.0, 10.0, 20.0]), 3).collapse);
    }

    #[test]
    fn single_rank_zero_member_never_collapses() {
        let mut d = CollapseDetector::new(10, false);
        d.observe(&frontier(&[0.0, 2.0, 4.0]), 3);
        assert!(!d.observe(&frontier(&[1.0, 1.0001]), 1).collapse);
    }

    #[test]
    fn no_history_means_no_relative_collapse() {
        let mut d = CollapseDetector::new(10, false);
        let v = d.observe(&frontier(&[1.0, 1.0]), 2);
        assert_eq!(v.reference, 0.0);
        assert!(!v.collapse);
    }

    #[test]
    fn legacy_criterion_is_gated_by_flag() {
        let tight = frontier(&[1.0, 1.0]);
        assert!(!CollapseDetector::new(5, false).observe(&tight, 2).legacy_collapse);
        assert!(CollapseDetector::new(5, true).observe(&tight, 2).legacy_collapse);
    }

    #[test]
    fn window_forgets_old_depths() {
        let mut d = CollapseDetector::new(2, false);
        d.observe(&frontier(&[0.0, 100.0]), 2);
        d.observe(&frontier(&[0.0, 1.0]), 2);
        d.observe(&frontier(&[0.0, 1.0]), 2);
        let expected = mean_nn_dist(&frontier(&[0.0, 1.0]));
        assert!((d.reference() - expected).abs() < 1e-12);
    }
}
