use std::fmt;

use serde::{Deserialize, Serialize};

pub const OBJECTIVE_COUNT: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    Minimize,
    Maximize,
}

impl Direction {
    /// Maps a value onto a "larger is better" axis.
    pub fn orient(self, value: f64) -> f64 {
        match self {
            Direction::Minimize => -value,
            Direction::Maximize => value,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Objective {
    Cost,
    Performance,
    Reliability,
    Structure,
    Field,
}

impl Objective {
    pub const ALL: [Objective; OBJECTIVE_COUNT] = [
        Objective::Cost,
        Objective::Performance,
        Objective::Reliability,
        Objective::Structure,
        Objective::Field,
    ];

    pub fn index(self) -> usize {
        match self {
            Objective::Cost => 0,
            Objective::Performance => 1,
            Objective::Reliability => 2,
            Objective::Structure => 3,
            Objective::Field => 4,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Objective::Cost | Objective::Structure | Objective::Field => Direction::Minimize,
            Objective::Performance | Objective::Reliability => Direction::Maximize,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Objective::Cost => "cost",
            Objective::Performance => "performance",
            Objective::Reliability => "reliability",
            Objective::Structure => "structure",
            Objective::Field => "field",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveVector {
    pub cost: f64,
    pub performance: f64,
    pub reliability: f64,
    pub structure: f64,
    pub field: f64,
}

impl ObjectiveVector {
    pub fn from_array(values: [f64; OBJECTIVE_COUNT]) -> Self {
        Self {
            cost: values[0],
            performance: values[1],
            reliability: values[2],
            structure: values[3],
            field: values[4],
        }
    }

    pub fn to_array(&self) -> [f64; OBJECTIVE_COUNT] {
        [
            self.cost,
            self.performance,
            self.reliability,
            self.structure,
            self.field,
        ]
    }

    pub fn get(&self, objective: Objective) -> f64 {
        self.to_array()[objective.index()]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Every component rewritten so that larger means better.
    pub fn oriented(&self) -> [f64; OBJECTIVE_COUNT] {
        let raw = self.to_array();
        let mut out = [0.0; OBJECTIVE_COUNT];
        for objective in Objective::ALL {
            let i = objective.index();
            out[i] = objective.direction().orient(raw[i]);
        }
        out
    }
}

/// Linear weighting of the five objectives. Uniform unless configured.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub cost: f64,
    pub performance: f64,
    pub reliability: f64,
    pub structure: f64,
    pub field: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self::uniform()
    }
}

impl ObjectiveWeights {
    pub fn uniform() -> Self {
        let w = 1.0 / OBJECTIVE_COUNT as f64;
        Self {
            cost: w,
            performance: w,
            reliability: w,
            structure: w,
            field: w,
        }
    }

    pub fn to_array(&self) -> [f64; OBJECTIVE_COUNT] {
        [
            self.cost,
            self.performance,
            self.reliability,
            self.structure,
            self.field,
        ]
    }

    pub fn get(&self, objective: Objective) -> f64 {
        self.to_array()[objective.index()]
    }

    pub fn sum(&self) -> f64 {
        self.to_array().iter().sum()
    }

    /// Weighted sum of the oriented components of `v`.
    pub fn score(&self, v: &ObjectiveVector) -> f64 {
        let w = self.to_array();
        v.oriented().iter().zip(w.iter()).map(|(x, w)| x * w).sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(pub u128);

impl StateId {
    pub fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub u128);

impl RuleId {
    pub fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RuleCategory {
    Structural,
    Performance,
    Reliability,
    Cost,
    Refactor,
    ConstraintPropagation,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 6] = [
        RuleCategory::Structural,
        RuleCategory::Performance,
        RuleCategory::Reliability,
        RuleCategory::Cost,
        RuleCategory::Refactor,
        RuleCategory::ConstraintPropagation,
    ];

    pub fn index(self) -> usize {
        match self {
            RuleCategory::Structural => 0,
            RuleCategory::Performance => 1,
            RuleCategory::Reliability => 2,
            RuleCategory::Cost => 3,
            RuleCategory::Refactor => 4,
            RuleCategory::ConstraintPropagation => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RuleCategory::Structural => "Structural",
            RuleCategory::Performance => "Performance",
            RuleCategory::Reliability => "Reliability",
            RuleCategory::Cost => "Cost",
            RuleCategory::Refactor => "Refactor",
            RuleCategory::ConstraintPropagation => "ConstraintPropagation",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::{Direction, Objective, ObjectiveVector, ObjectiveWeights, RuleCategory, StateId};

    #[test]
    fn directions_follow_objective_meaning() {
        assert_eq!(Objective::Cost.direction(), Direction::Minimize);
        assert_eq!(Objective::Structure.direction(), Direction::Minimize);
        assert_eq!(Objective::Field.direction(), Direction::Minimize);
        assert_eq!(Objective::Performance.direction(), Direction::Maximize);
        assert_eq!(Objective::Reliability.direction(), Direction::Maximize);
    }

    #[test]
    fn oriented_flips_minimized_objectives() {
        let v = ObjectiveVector::from_array([1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(v.oriented(), [-1.0, 2.0, 3.0, -4.0, -5.0]);
    }

    #[test]
    fn uniform_weights_sum_to_one() {
        let w = ObjectiveWeights::default();
        assert!((w.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ids_print_as_fixed_width_hex() {
        assert_eq!(StateId(0xab).to_string().len(), 32);
        assert!(StateId(0xab).to_string().ends_with("ab"));
    }

    #[test]
    fn category_indices_are_dense() {
        for (i, c) in RuleCategory::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    proptest! {
        #[test]
        fn array_conversion_preserves_objectives(
            values in proptest::array::uniform5(-1e6f64..1e6),
        ) {
            let v = ObjectiveVector::from_array(values);
            for objective in Objective::ALL {
                prop_assert_eq!(v.get(objective), values[objective.index()]);
            }
        }
    }
}
