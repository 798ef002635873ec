use std::collections::BTreeMap;

use core_types::{RuleCategory, StateId};

use crate::config::BalanceMode;
use crate::engine::statistics::shannon_entropy_from_counts;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BalanceItem {
    pub id: StateId,
    pub category: RuleCategory,
    pub base_score: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BalanceOutcome {
    /// Indices into the input, in retention order.
    pub retained: Vec<usize>,
    /// `S_final` per input item. Equal to `S_base` outside soft mode.
    pub final_scores: Vec<f64>,
    pub category_counts: BTreeMap<RuleCategory, usize>,
    /// Entropy of the generated category shares.
    pub generation_entropy: f64,
}

/// Gates generated children by category exposure.
#[derive(Clone, Debug)]
pub struct CategoryBalancer {
    mode: BalanceMode,
    budget: usize,
    entropy_beta: f64,
}

impl CategoryBalancer {
    pub fn new(mode: BalanceMode, budget: usize, entropy_beta: f64) -> Self {
        Self {
            mode,
            budget,
            entropy_beta,
        }
    }

    pub fn apply(&self, items: &[BalanceItem]) -> BalanceOutcome {
        let mut category_counts: BTreeMap<RuleCategory, usize> = BTreeMap::new();
        for item in items {
            *category_counts.entry(item.category).or_insert(0) += 1;
        }
        let generation_entropy = shannon_entropy_from_counts(&category_counts);
        let base: Vec<f64> = items.iter().map(|i| i.base_score).collect();

        let (retained, final_scores) = match self.mode {
            BalanceMode::Off => ((0..items.len()).collect(), base),
            BalanceMode::Hard { m } => (self.hard(items, m), base),
            BalanceMode::Soft { alpha, temperature } => {
                let multipliers = soft_multipliers(&category_counts, alpha, temperature);
                let scores: Vec<f64> = items
                    .iter()
                    .map(|i| {
                        let w = multipliers.get(&i.category).copied().unwrap_or(1.0);
                        i.base_score * w + self.entropy_beta * generation_entropy
                    })
                    .collect();
                let mut order = ordered_by_score(items, &scores);
                order.truncate(self.budget);
                (order, scores)
            }
        };

        BalanceOutcome {
            retained,
            final_scores,
            category_counts,
            generation_entropy,
        }
    }

    /// Up to `m` per category first, then the best of the rest up to the budget.
    /// The guarantee wins when it alone exceeds the budget.
    fn hard(&self, items: &[BalanceItem], m: usize) -> Vec<usize> {
        let scores: Vec<f64> = items.iter().map(|i| i.base_score).collect();
        let order = ordered_by_score(items, &scores);
        let mut taken_per_category: BTreeMap<RuleCategory, usize> = BTreeMap::new();
        let mut keep = vec![false; items.len()];
        for &i in &order {
            let taken = taken_per_category.entry(items[i].category).or_insert(0);
            if *taken < m {
                *taken += 1;
                keep[i] = true;
            }
        }
        let mut kept = keep.iter().filter(|k| **k).count();
        for &i in &order {
            if kept >= self.budget {
                break;
            }
            if !keep[i] {
                keep[i] = true;
                kept += 1;
            }
        }
        order.into_iter().filter(|i| keep[*i]).collect()
    }
}

/// `K * softmax(w / T)` with `w_i = exp(-alpha * (p_i - 1/K))`.
pub fn soft_multipliers(
    counts: &BTreeMap<RuleCategory, usize>,
    alpha: f64,
    temperature: f64,
) -> BTreeMap<RuleCategory, f64> {
    let total: usize = counts.values().sum();
    if total == 0 {
        return BTreeMap::new();
    }
    let k = counts.len() as f64;
    let u = 1.0 / k;
    let logits: Vec<(RuleCategory, f64)> = counts
        .iter()
        .map(|(c, n)| {
            let p = *n as f64 / total as f64;
            (*c, (-alpha * (p - u)).exp() / temperature)
        })
        .collect();
    let max_logit = logits
        .iter()
        .map(|(_, l)| *l)
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<(RuleCategory, f64)> = logits
        .into_iter()
        .map(|(c, l)| (c, (l - max_logit).exp()))
        .collect();
    let z: f64 = exps.iter().map(|(_, e)| *e).sum();
    exps.into_iter().map(|(c, e)| (c, k * e / z)).collect()
}

fn ordered_by_score(items: &[BalanceItem], scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&l, &r| {
        scores[r]
            .total_cmp(&scores[l])
            .then_with(|| items[l].id.cmp(&items[r].id))
    });
    order
}
