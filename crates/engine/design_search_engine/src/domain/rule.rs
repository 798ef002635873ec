use std::collections::BTreeSet;

use core_types::{RuleCategory, RuleId};
use serde::{Deserialize, Serialize};

use crate::domain::state::{DesignState, max_edges};
use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transformation {
    /// New node wired to at most `edges` existing nodes.
    AddNode { edges: u32 },
    RemoveNode,
    AddEdge,
    RemoveEdge,
    AddConstraint,
    RelaxConstraint,
    /// One child per split width `1..=parts`.
    Split { parts: u32 },
}

impl Transformation {
    pub fn is_applicable(&self, state: &DesignState) -> bool {
        let n = state.node_count;
        let e = state.edge_count;
        let c = state.constraint_count;
        match self {
            Transformation::AddNode { .. } => n < u32::MAX,
            Transformation::RemoveNode => n > 1,
            Transformation::AddEdge => e < max_edges(n),
            Transformation::RemoveEdge => e > 0,
            Transformation::AddConstraint => c < n.saturating_mul(2),
            Transformation::RelaxConstraint => c > 0,
            Transformation::Split { parts } => *parts > 0 && n >= 1,
        }
    }

    /// Child counters as `(node_count, edge_count, constraint_count)`.
    fn outcomes(&self, state: &DesignState) -> Vec<(u32, u32, u32)> {
        let n = state.node_count;
        let e = state.edge_count;
        let c = state.constraint_count;
        match self {
            Transformation::AddNode { edges } => {
                let wired = (*edges).min(n);
                vec![(n + 1, e.saturating_add(wired), c)]
            }
            Transformation::RemoveNode => {
                let next_n = n - 1;
                let dropped = e / n.max(1);
                let next_e = (e - dropped).min(max_edges(next_n));
                vec![(next_n, next_e, c.min(next_n.saturating_mul(2)))]
            }
            Transformation::AddEdge => vec![(n, e + 1, c)],
            Transformation::RemoveEdge => vec![(n, e - 1, c)],
            Transformation::AddConstraint => vec![(n, e, c + 1)],
            Transformation::RelaxConstraint => vec![(n, e, c - 1)],
            Transformation::Split { parts } => (1..=*parts)
                .map(|j| (n.saturating_add(j), e.saturating_add(j), c))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignRule {
    pub id: RuleId,
    pub name: String,
    pub category: RuleCategory,
    pub priority: f64,
    pub transformation: Transformation,
}

impl DesignRule {
    pub fn new(
        id: u128,
        name: impl Into<String>,
        category: RuleCategory,
        priority: f64,
        transformation: Transformation,
    ) -> Self {
        Self {
            id: RuleId(id),
            name: name.into(),
            category,
            priority,
            transformation,
        }
    }

    pub fn is_applicable(&self, state: &DesignState) -> bool {
        self.transformation.is_applicable(state)
    }
}

/// Pure: `(rule, state) -> children`. A failing precondition yields nothing.
pub fn apply_rule(rule: &DesignRule, state: &DesignState) -> Vec<DesignState> {
    if !rule.is_applicable(state) {
        return Vec::new();
    }
    rule.transformation
        .outcomes(state)
        .into_iter()
        .enumerate()
        .map(|(idx, counters)| state.derive_child(rule.id, rule.category, idx, counters))
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<DesignRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<DesignRule>) -> Self {
        Self { rules }
    }

    pub fn default_catalogue() -> Self {
        Self::new(vec![
            DesignRule::new(
                0x101,
                "introduce-service",
                RuleCategory::Structural,
                1.0,
                Transformation::AddNode { edges: 2 },
            ),
            DesignRule::new(
                0x102,
                "add-fast-path",
                RuleCategory::Performance,
                0.9,
                Transformation::AddEdge,
            ),
            DesignRule::new(
                0x103,
                "add-health-check",
                RuleCategory::Reliability,
                0.8,
                Transformation::AddConstraint,
            ),
            DesignRule::new(
                0x104,
                "drop-component",
                RuleCategory::Cost,
                0.7,
                Transformation::RemoveNode,
            ),
            DesignRule::new(
                0x105,
                "prune-dependency",
                RuleCategory::Cost,
                0.6,
                Transformation::RemoveEdge,
            ),
            DesignRule::new(
                0x106,
                "split-module",
                RuleCategory::Refactor,
                0.75,
                Transformation::Split { parts: 2 },
            ),
            DesignRule::new(
                0x107,
                "relax-invariant",
                RuleCategory::ConstraintPropagation,
                0.5,
                Transformation::RelaxConstraint,
            ),
        ])
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.is_empty() {
            return Err(ConfigError::EmptyRuleSet);
        }
        let mut seen = BTreeSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id) {
                return Err(ConfigError::DuplicateRule(rule.id));
            }
            if rule.name.trim().is_empty() {
                return Err(ConfigError::InvalidRule {
                    id: rule.id,
                    reason: "name is empty".to_string(),
                });
            }
            if !rule.priority.is_finite() {
                return Err(ConfigError::InvalidRule {
                    id: rule.id,
                    reason: "priority must be finite".to_string(),
                });
            }
            if let Transformation::Split { parts } = rule.transformation {
                if parts == 0 || parts > 16 {
                    return Err(ConfigError::InvalidRule {
                        id: rule.id,
                        reason: format!("split parts {parts} outside 1..=16"),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> &[DesignRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn categories(&self) -> Vec<RuleCategory> {
        let set: BTreeSet<RuleCategory> = self.rules.iter().map(|r| r.category).collect();
        set.into_iter().collect()
    }

    pub fn applicable<'a>(
        &'a self,
        state: &'a DesignState,
    ) -> impl Iterator<Item = &'a DesignRule> {
        self.rules.iter().filter(move |rule| rule.is_applicable(state))
    }
}

#[cfg(test)]
mod tests {
    use core_types::RuleCategory;

    use super::*;

    #[test]
    fn split_yields_one_child_per_part() {
        let root = DesignState::root(1, 4, 3);
        let rule = DesignRule::new(
            1,
            "split",
            RuleCategory::Refactor,
            1.0,
            Transformation::Split { parts: 3 },
        );
        let children = apply_rule(&rule, &root);
        assert_eq!(children.len(), 3);
        assert_eq!(children[2].node_count, 7);
        assert!(children.iter().all(|c| c.depth == 1));
    }

    #[test]
    fn failing_precondition_yields_no_children() {
        let root = DesignState::root(1, 1, 0);
        let remove = DesignRule::new(
            2,
            "remove",
            RuleCategory::Cost,
            1.0,
            Transformation::RemoveNode,
        );
        let relax = DesignRule::new(
            3,
            "relax",
            RuleCategory::ConstraintPropagation,
            1.0,
            Transformation::RelaxConstraint,
        );
        let prune = DesignRule::new(
            4,
            "prune",
            RuleCategory::Cost,
            1.0,
            Transformation::RemoveEdge,
        );
        assert!(apply_rule(&remove, &root).is_empty());
        assert!(apply_rule(&relax, &root).is_empty());
        assert!(apply_rule(&prune, &root).is_empty());
    }

    #[test]
    fn remove_node_keeps_edges_within_simple_graph_bound() {
        let root = DesignState::root(1, 3, 6);
        let rule = DesignRule::new(
            2,
            "remove",
            RuleCategory::Cost,
            1.0,
            Transformation::RemoveNode,
        );
        let child = &apply_rule(&rule, &root)[0];
        assert_eq!(child.node_count, 2);
        assert!(child.edge_count <= 2);
    }

    #[test]
    fn catalogue_is_valid_and_covers_every_category() {
        let rules = RuleSet::default_catalogue();
        assert_eq!(rules.validate(), Ok(()));
        assert_eq!(rules.categories().len(), RuleCategory::ALL.len());
    }

    #[test]
    fn validation_rejects_duplicates_and_empty_sets() {
        assert_eq!(RuleSet::default().validate(), Err(ConfigError::EmptyRuleSet));
        let dup = RuleSet::new(vec![
            DesignRule::new(1, "a", RuleCategory::Cost, 1.0, Transformation::AddEdge),
            DesignRule::new(1, "b", RuleCategory::Cost, 1.0, Transformation::AddEdge),
        ]);
        assert_eq!(dup.validate(), Err(ConfigError::DuplicateRule(RuleId(1))));
        let nan = RuleSet::new(vec![DesignRule::new(
            1,
            "a",
            RuleCategory::Cost,
            f64::NAN,
            Transformation::AddEdge,
        )]);
        assert!(matches!(nan.validate(), Err(ConfigError::InvalidRule { .. })));
    }
}
