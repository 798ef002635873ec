use std::convert::Infallible;
use std::sync::{Mutex, PoisonError};

use core_types::{ObjectiveVector, ObjectiveWeights, RuleCategory};
use field_engine::{FieldEngine, TargetField, field_distance};
use rayon::prelude::*;

use crate::domain::{DesignState, Fingerprint};
use crate::engine::cache::BoundedProjectionCache;
use crate::engine::statistics::logistic;
use crate::error::ConfigError;

/// Field value used when the projection is switched off.
pub const FIELD_NEUTRAL: f64 = 0.5;

pub type ProjectionCache = BoundedProjectionCache<Fingerprint, f64>;

#[derive(Clone, Debug)]
struct FieldScorer {
    engine: FieldEngine,
    target: TargetField,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoredBatch {
    pub vectors: Vec<ObjectiveVector>,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

#[derive(Clone, Debug)]
pub struct ObjectiveModel {
    weights: ObjectiveWeights,
    field: Option<FieldScorer>,
}

impl ObjectiveModel {
    /// `field_dimensions` of `None` disables the Field objective.
    pub fn new(
        weights: ObjectiveWeights,
        field_dimensions: Option<usize>,
        target_categories: &[RuleCategory],
    ) -> Result<Self, ConfigError> {
        let field = match field_dimensions {
            None => None,
            Some(dim) => {
                let engine = FieldEngine::new(dim).ok_or(ConfigError::OutOfRange {
                    field: "field_dimensions",
                    value: dim.to_string(),
                    range: "1..=1024",
                })?;
                let target = engine.target_for(target_categories);
                Some(FieldScorer { engine, target })
            }
        };
        Ok(Self { weights, field })
    }

    pub fn weights(&self) -> &ObjectiveWeights {
        &self.weights
    }

    pub fn field_enabled(&self) -> bool {
        self.field.is_some()
    }

    /// Structural objectives. Field is left at `FIELD_NEUTRAL`.
    pub fn cheap(&self, state: &DesignState) -> ObjectiveVector {
        let n = state.node_count as f64;
        let e = state.edge_count as f64;
        let c = state.constraint_count as f64;
        let h = state.history_length as f64;
        let k = state.categories.len() as f64;
        let density = state.density();
        ObjectiveVector {
            cost: n + 0.5 * e + 0.25 * c,
            performance: (1.0 + n).ln() - 0.25 * density,
            reliability: c / (c + n + 1.0) + 0.15 * density.min(2.0),
            structure: (density - 1.2).abs() + 0.01 * h + 0.05 * k,
            field: FIELD_NEUTRAL,
        }
    }

    /// Quality proxy in `(0, 1)` built from the structural objectives only.
    pub fn base_score(&self, v: &ObjectiveVector) -> f64 {
        let w = &self.weights;
        logistic(
            w.performance * v.performance + w.reliability * v.reliability
                - w.cost * (1.0 + v.cost.max(0.0)).ln()
                - w.structure * v.structure,
        )
    }

    /// Weighted sum of oriented scaled objectives.
    pub fn total_score(&self, scaled: &ObjectiveVector) -> f64 {
        self.weights.score(scaled)
    }

    fn project(&self, state: &DesignState) -> f64 {
        match &self.field {
            Some(scorer) => field_distance(
                &scorer.engine.project(&state.field_signature()),
                &scorer.target,
            ),
            None => FIELD_NEUTRAL,
        }
    }

    /// Full score of one state through the cache. Single-candidate entry
    /// point; the search itself scores whole depths with `complete_batch`,
    /// which keeps lookups and inserts apart so batches stay order-independent.
    pub fn score(
        &self,
        state: &DesignState,
        cache: &Mutex<ProjectionCache>,
    ) -> (ObjectiveVector, bool) {
        let mut v = self.cheap(state);
        if self.field.is_none() {
            return (v, false);
        }
        let mut guard = cache.lock().unwrap_or_else(PoisonError::into_inner);
        let computed = guard.get_or_insert(state.fingerprint(), || {
            Ok::<_, Infallible>(self.project(state))
        });
        let (field, hit) = match computed {
            Ok(found) => found,
            Err(never) => match never {},
        };
        v.field = field;
        (v, hit)
    }

    /// Adds the Field objective to `cheap` vectors of `states`.
    ///
    /// Lookups, then projection of misses (in parallel when asked), then
    /// inserts in candidate order. Cache contents and hit counts are the same
    /// whether or not the middle phase runs on the rayon pool.
    pub fn complete_batch(
        &self,
        states: &[&DesignState],
        mut cheap: Vec<ObjectiveVector>,
        cache: &Mutex<ProjectionCache>,
        parallel: bool,
    ) -> ScoredBatch {
        if self.field.is_none() {
            return ScoredBatch {
                vectors: cheap,
                cache_hits: 0,
                cache_misses: 0,
            };
        }
        let keys: Vec<Fingerprint> = states.iter().map(|s| s.fingerprint()).collect();
        let found: Vec<Option<f64>> = {
            let mut guard = cache.lock().unwrap_or_else(PoisonError::into_inner);
            keys.iter()
                .map(|k| {
                    let hit = guard.get(k);
                    guard.record_lookup(hit.is_some());
                    hit
                })
                .collect()
        };
        let missing: Vec<usize> = (0..states.len()).filter(|i| found[*i].is_none()).collect();
        let computed: Vec<f64> = if parallel {
            missing.par_iter().map(|i| self.project(states[*i])).collect()
        } else {
            missing.iter().map(|i| self.project(states[*i])).collect()
        };
        {
            let mut guard = cache.lock().unwrap_or_else(PoisonError::into_inner);
            for (i, value) in missing.iter().zip(computed.iter()) {
                guard.insert(keys[*i], *value);
            }
        }

        let mut computed_iter = computed.into_iter();
        for (v, hit) in cheap.iter_mut().zip(found.iter()) {
            v.field = match hit {
                Some(value) => *value,
                None => computed_iter.next().unwrap_or(FIELD_NEUTRAL),
            };
        }
        ScoredBatch {
            vectors: cheap,
            cache_hits: keys.len() - missing.len(),
            cache_misses: missing.len(),
        }
    }
}
