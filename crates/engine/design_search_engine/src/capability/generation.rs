use std::collections::{BTreeMap, BTreeSet};

use core_types::RuleCategory;

use crate::domain::{DesignState, Fingerprint, RuleSet, apply_rule};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Generation {
    /// Unique by fingerprint, ordered by id.
    pub children: Vec<DesignState>,
    /// Category of the rule that produced each child.
    pub categories: Vec<RuleCategory>,
    /// Categories of rules that were applicable to at least one parent.
    pub applicable_categories: BTreeSet<RuleCategory>,
    pub duplicates_removed: usize,
    /// Parents with no applicable rule.
    pub exhausted_parents: usize,
}

pub struct CandidateGenerator<'a> {
    rules: &'a RuleSet,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    /// Applies every applicable rule to every frontier member. Structurally
    /// identical children collapse onto the one with the lowest id.
    pub fn generate(&self, frontier: &[DesignState]) -> Generation {
        let mut out = Generation::default();
        let mut by_fingerprint: BTreeMap<Fingerprint, (DesignState, RuleCategory)> =
            BTreeMap::new();
        let mut produced = 0usize;
        for parent in frontier {
            let mut any = false;
            for rule in self.rules.applicable(parent) {
                any = true;
                out.applicable_categories.insert(rule.category);
                for child in apply_rule(rule, parent) {
                    produced += 1;
                    let fp = child.fingerprint();
                    let keep_existing = by_fingerprint
                        .get(&fp)
                        .is_some_and(|(existing, _)| existing.id <= child.id);
                    if !keep_existing {
                        by_fingerprint.insert(fp, (child, rule.category));
                    }
                }
            }
            if !any {
                out.exhausted_parents += 1;
            }
        }
        let mut children: Vec<(DesignState, RuleCategory)> = by_fingerprint.into_values().collect();
        children.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        out.duplicates_removed = produced - children.len();
        let (states, categories): (Vec<DesignState>, Vec<RuleCategory>) =
            children.into_iter().unzip();
        out.children = states;
        out.categories = categories;
        out
    }
}
