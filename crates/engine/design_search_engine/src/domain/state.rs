use std::collections::BTreeSet;

use core_types::{RuleCategory, RuleId, StateId};
use field_engine::FieldSignature;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Content hash of a design's structure. Two states with the same counters and
/// ancestry categories share a fingerprint whatever path produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Fingerprint(pub u128);

/// Immutable snapshot of a candidate design. Children are new values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DesignState {
    pub id: StateId,
    pub parent_id: Option<StateId>,
    pub depth: usize,
    pub node_count: u32,
    pub edge_count: u32,
    pub constraint_count: u32,
    pub history_length: u32,
    pub categories: BTreeSet<RuleCategory>,
    pub origin: Option<RuleCategory>,
}

impl DesignState {
    pub fn root(seed: u64, node_count: u32, edge_count: u32) -> Self {
        let mut acc = 0xcbf29ce484222325u128;
        acc = fnv_mix_u128(acc, seed as u128);
        acc = fnv_mix_u128(acc, node_count as u128);
        acc = fnv_mix_u128(acc, edge_count as u128);
        Self {
            id: StateId(acc),
            parent_id: None,
            depth: 0,
            node_count,
            edge_count: edge_count.min(max_edges(node_count)),
            constraint_count: 0,
            history_length: 0,
            categories: BTreeSet::new(),
            origin: None,
        }
    }

    /// Builds a child one depth below `self` carrying the given counters.
    pub fn derive_child(
        &self,
        rule_id: RuleId,
        category: RuleCategory,
        child_index: usize,
        counters: (u32, u32, u32),
    ) -> Self {
        let (node_count, edge_count, constraint_count) = counters;
        let mut categories = self.categories.clone();
        categories.insert(category);
        Self {
            id: child_state_id(self.id, rule_id, child_index),
            parent_id: Some(self.id),
            depth: self.depth + 1,
            node_count,
            edge_count,
            constraint_count,
            history_length: self.history_length.saturating_add(1),
            categories,
            origin: Some(category),
        }
    }

    pub fn density(&self) -> f64 {
        self.edge_count as f64 / self.node_count.max(1) as f64
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.node_count.to_le_bytes());
        hasher.update(self.edge_count.to_le_bytes());
        hasher.update(self.constraint_count.to_le_bytes());
        for category in &self.categories {
            hasher.update([category.index() as u8]);
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Fingerprint(u128::from_le_bytes(bytes))
    }

    pub fn field_signature(&self) -> FieldSignature {
        FieldSignature {
            seed: self.fingerprint().0 as u64,
            node_count: self.node_count,
            edge_count: self.edge_count,
            constraint_count: self.constraint_count,
            categories: self.categories.iter().copied().collect(),
        }
    }
}

/// Directed simple graph bound on edges for `node_count` nodes.
pub fn max_edges(node_count: u32) -> u32 {
    let n = node_count as u64;
    (n * n.saturating_sub(1)).min(u32::MAX as u64) as u32
}

fn child_state_id(parent: StateId, rule: RuleId, child_index: usize) -> StateId {
    let mut acc = 0xcbf29ce484222325u128;
    acc = fnv_mix_u128(acc, parent.as_u128());
    acc = fnv_mix_u128(acc, rule.as_u128());
    acc = fnv_mix_u128(acc, child_index as u128 + 1);
    StateId(acc)
}

fn fnv_mix_u128(acc: u128, value: u128) -> u128 {
    let prime = 0x0000000001000000000000000000013Bu128;
    (acc ^ value).wrapping_mul(prime)
}

#[cfg(test)]
mod tests {
    use core_types::{RuleCategory, RuleId};

    use super::DesignState;

    #[test]
    fn child_depth_is_parent_depth_plus_one() {
        let root = DesignState::root(42, 6, 5);
        let child = root.derive_child(RuleId(1), RuleCategory::Cost, 0, (5, 4, 0));
        assert_eq!(root.depth, 0);
        assert_eq!(child.depth, 1);
        assert_eq!(child.parent_id, Some(root.id));
        assert_eq!(child.origin, Some(RuleCategory::Cost));
        assert!(child.categories.contains(&RuleCategory::Cost));
    }

    #[test]
    fn ids_are_deterministic_and_distinct_per_child_index() {
        let root = DesignState::root(42, 6, 5);
        let a = root.derive_child(RuleId(9), RuleCategory::Refactor, 0, (7, 6, 0));
        let b = root.derive_child(RuleId(9), RuleCategory::Refactor, 1, (8, 7, 0));
        let a2 = root.derive_child(RuleId(9), RuleCategory::Refactor, 0, (7, 6, 0));
        assert_eq!(a.id, a2.id);
        assert_ne!(a.id, b.id);
        assert_ne!(DesignState::root(1, 6, 5).id, DesignState::root(2, 6, 5).id);
    }

    #[test]
    fn fingerprint_ignores_identity_but_tracks_structure() {
        let root = DesignState::root(42, 6, 5);
        let a = root.derive_child(RuleId(1), RuleCategory::Structural, 0, (7, 6, 0));
        let b = root.derive_child(RuleId(2), RuleCategory::Structural, 0, (7, 6, 0));
        let c = root.derive_child(RuleId(2), RuleCategory::Structural, 0, (7, 7, 0));
        assert_ne!(a.id, b.id);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
