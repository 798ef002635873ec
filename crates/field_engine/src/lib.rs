use std::collections::BTreeMap;

use core_types::RuleCategory;
use num_complex::Complex;

pub type Scalar = Complex<f32>;

pub const MAX_DIMENSIONS: usize = 1024;
/// Upper bound on pseudo-nodes folded into one projection.
pub const MAX_PROJECTED_NODES: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub struct FieldVector {
    pub data: Vec<Scalar>,
}

impl FieldVector {
    pub fn zeros(dimensions: usize) -> Self {
        Self {
            data: vec![Complex::new(0.0, 0.0); dimensions],
        }
    }

    pub fn dimensions(&self) -> usize {
        self.data.len()
    }

    pub fn scale(&self, factor: f32) -> Self {
        let data = self.data.iter().map(|v| *v * factor).collect();
        Self { data }
    }

    pub fn add(&self, other: &Self) -> Self {
        let len = self.dimensions().min(other.dimensions());
        let mut data = Vec::with_capacity(len);
        for i in 0..len {
            data.push(self.data[i] + other.data[i]);
        }
        Self { data }
    }

    pub fn normalized(&self) -> Self {
        let norm_sq: f32 = self.data.iter().map(|v| v.norm_sqr()).sum();
        if norm_sq <= f32::EPSILON {
            return self.clone();
        }
        let norm = norm_sq.sqrt();
        let data = self.data.iter().map(|v| *v / norm).collect();
        Self { data }
    }

    pub fn average(vectors: &[FieldVector], dimensions: usize) -> Self {
        if vectors.is_empty() {
            return FieldVector::zeros(dimensions);
        }

        let mut acc = FieldVector::zeros(dimensions);
        for v in vectors {
            acc = acc.add(v);
        }
        acc.scale(1.0 / vectors.len() as f32)
    }
}

/// Structural summary of a design that the projector consumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSignature {
    pub seed: u64,
    pub node_count: u32,
    pub edge_count: u32,
    pub constraint_count: u32,
    pub categories: Vec<RuleCategory>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TargetField {
    pub data: FieldVector,
}

impl TargetField {
    /// Normalized mean of the category bases in `categories`.
    pub fn from_categories(projector: &HybridProjector, categories: &[RuleCategory]) -> Self {
        let bases: Vec<FieldVector> = categories.iter().map(|c| projector.basis_for(*c)).collect();
        let data = FieldVector::average(&bases, projector.dimensions()).normalized();
        Self { data }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HybridProjector {
    dimension: usize,
    alpha: f32,
    beta: f32,
    category_basis: BTreeMap<RuleCategory, FieldVector>,
}

impl HybridProjector {
    pub fn new(dimension: usize, alpha: f32, beta: f32) -> Option<Self> {
        if dimension == 0 || dimension > MAX_DIMENSIONS {
            return None;
        }

        let mut category_basis = BTreeMap::new();
        for category in RuleCategory::ALL {
            category_basis.insert(
                category,
                build_category_basis(dimension, category.index() as u64),
            );
        }

        Some(Self {
            dimension,
            alpha,
            beta,
            category_basis,
        })
    }

    pub fn default_coefficients(dimension: usize) -> Option<Self> {
        Self::new(dimension, 0.8, 0.2)
    }

    pub fn dimensions(&self) -> usize {
        self.dimension
    }

    pub fn basis_for(&self, category: RuleCategory) -> FieldVector {
        self.category_basis
            .get(&category)
            .cloned()
            .unwrap_or_else(|| FieldVector::zeros(self.dimension))
    }

    fn hash_projection(&self, seed: u64) -> FieldVector {
        let mut data = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            let x = splitmix64(seed.wrapping_add((i as u64).wrapping_mul(0x9e3779b97f4a7c15)));
            let re = if (x & 0b01) == 0 { 1.0 } else { -1.0 };
            let im = if (x & 0b10) == 0 { 1.0 } else { -1.0 };
            data.push(Complex::new(re, im));
        }
        FieldVector { data }
    }

    /// One pseudo-node: hashed identity blended with the basis of its category.
    fn project_node(&self, node_seed: u64, category: Option<RuleCategory>) -> FieldVector {
        let h = self.hash_projection(node_seed);
        match category {
            Some(c) => h.scale(self.alpha).add(&self.basis_for(c).scale(self.beta)),
            None => h.scale(self.alpha),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldEngine {
    projector: HybridProjector,
}

impl FieldEngine {
    /// Returns `None` when `dimensions` is outside `1..=MAX_DIMENSIONS`.
    pub fn new(dimensions: usize) -> Option<Self> {
        HybridProjector::default_coefficients(dimensions).map(|projector| Self { projector })
    }

    pub fn dimensions(&self) -> usize {
        self.projector.dimensions()
    }

    pub fn projector(&self) -> &HybridProjector {
        &self.projector
    }

    pub fn target_for(&self, categories: &[RuleCategory]) -> TargetField {
        TargetField::from_categories(&self.projector, categories)
    }

    /// Folds pseudo-nodes with `1/(idx+1)` weights. Nodes cycle through the
    /// signature's categories; edges and constraints tilt the per-node seed.
    pub fn project(&self, signature: &FieldSignature) -> FieldVector {
        let nodes = (signature.node_count as usize).clamp(1, MAX_PROJECTED_NODES);
        let mut acc = FieldVector::zeros(self.dimensions());
        for idx in 0..nodes {
            let mut node_seed = fnv_u64(0xcbf29ce484222325, &signature.seed.to_le_bytes());
            node_seed = fnv_u64(node_seed, &(idx as u64).to_le_bytes());
            if (idx as u32) < signature.edge_count {
                node_seed = fnv_u64(node_seed, b"e");
            }
            if (idx as u32) < signature.constraint_count {
                node_seed = fnv_u64(node_seed, b"c");
            }
            let category = if signature.categories.is_empty() {
                None
            } else {
                Some(signature.categories[idx % signature.categories.len()])
            };
            let weight = 1.0f32 / (idx as f32 + 1.0);
            acc = acc.add(&self.projector.project_node(node_seed, category).scale(weight));
        }
        acc
    }
}

pub fn resonance_score(field: &FieldVector, target: &TargetField) -> f64 {
    let len = field.dimensions().min(target.data.dimensions());
    if len == 0 {
        return 0.0;
    }

    let mut dot = Complex::new(0.0f32, 0.0f32);
    let mut norm_f = 0.0f32;
    let mut norm_t = 0.0f32;

    for i in 0..len {
        let f = field.data[i];
        let t = target.data.data[i];
        dot += f * t.conj();
        norm_f += f.norm_sqr();
        norm_t += t.norm_sqr();
    }

    if norm_f <= f32::EPSILON || norm_t <= f32::EPSILON {
        return 0.0;
    }

    let denom = norm_f.sqrt() * norm_t.sqrt();
    (dot.norm() / denom).clamp(0.0, 1.0) as f64
}

/// `1 - resonance`, in `[0, 1]`.
pub fn field_distance(field: &FieldVector, target: &TargetField) -> f64 {
    (1.0 - resonance_score(field, target)).clamp(0.0, 1.0)
}

fn build_category_basis(dim: usize, category_seed: u64) -> FieldVector {
    let mut data = Vec::with_capacity(dim);
    for i in 0..dim {
        let x = splitmix64(category_seed.wrapping_add((i as u64).wrapping_mul(0xA24BAED4963EE407)));
        let re = if (x & 0b01) == 0 { 1.0 } else { -1.0 };
        let im = if (x & 0b10) == 0 { 1.0 } else { -1.0 };
        data.push(Complex::new(re, im));
    }
    FieldVector { data }
}

fn fnv_u64(mut state: u64, bytes: &[u8]) -> u64 {
    for b in bytes {
        state ^= *b as u64;
        state = state.wrapping_mul(0x100000001b3);
    }
    state
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use core_types::RuleCategory;
    use proptest::prelude::*;

    use crate::{FieldEngine, FieldSignature, HybridProjector, field_distance, resonance_score};

    fn signature(seed: u64, categories: Vec<RuleCategory>) -> FieldSignature {
        FieldSignature {
            seed,
            node_count: 6,
            edge_count: 5,
            constraint_count: 1,
            categories,
        }
    }

    #[test]
    fn projection_is_deterministic() {
        let engine = FieldEngine::new(64).expect("valid dimensions");
        let sig = signature(7, vec![RuleCategory::Structural]);
        assert_eq!(engine.project(&sig), engine.project(&sig));
    }

    #[test]
    fn category_bias_changes_projection() {
        let engine = FieldEngine::new(64).expect("valid dimensions");
        let a = engine.project(&signature(7, vec![RuleCategory::Cost]));
        let b = engine.project(&signature(7, vec![RuleCategory::Reliability]));
        assert_ne!(a, b);
    }

    #[test]
    fn dimensions_out_of_range_are_rejected() {
        assert!(FieldEngine::new(0).is_none());
        assert!(FieldEngine::new(2048).is_none());
        assert!(HybridProjector::new(1024, 0.8, 0.2).is_some());
    }

    #[test]
    fn matching_categories_resonate_more_than_foreign_ones() {
        let engine = FieldEngine::new(128).expect("valid dimensions");
        let target = engine.target_for(&[RuleCategory::Performance]);
        let aligned = engine.project(&signature(11, vec![RuleCategory::Performance]));
        let foreign = engine.project(&signature(11, vec![RuleCategory::Cost]));
        assert!(
            resonance_score(&aligned, &target) > resonance_score(&foreign, &target),
            "aligned projection should resonate more"
        );
    }

    proptest! {
        #[test]
        fn field_distance_is_bounded(seed in any::<u64>(), nodes in 0u32..400, idx in 0usize..6) {
            let engine = FieldEngine::new(32).expect("valid dimensions");
            let sig = FieldSignature {
                seed,
                node_count: nodes,
                edge_count: nodes / 2,
                constraint_count: 0,
                categories: vec![RuleCategory::ALL[idx]],
            };
            let target = engine.target_for(&RuleCategory::ALL);
            let d = field_distance(&engine.project(&sig), &target);
            prop_assert!((0.0..=1.0).contains(&d));
        }
    }
}
