use core_types::{OBJECTIVE_COUNT, ObjectiveVector};
use serde::Serialize;

use crate::config::NormalizationMode;
use crate::engine::statistics::{compute_mad, median};

/// Per-objective `(median, MAD)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NormalizationStats {
    pub median: [f64; OBJECTIVE_COUNT],
    pub mad: [f64; OBJECTIVE_COUNT],
}

impl Default for NormalizationStats {
    fn default() -> Self {
        Self {
            median: [0.0; OBJECTIVE_COUNT],
            mad: [1.0; OBJECTIVE_COUNT],
        }
    }
}

impl NormalizationStats {
    pub fn from_samples(samples: &[ObjectiveVector]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut median_out = [0.0; OBJECTIVE_COUNT];
        let mut mad_out = [0.0; OBJECTIVE_COUNT];
        for i in 0..OBJECTIVE_COUNT {
            let column: Vec<f64> = samples.iter().map(|v| v.to_array()[i]).collect();
            let med = median(column.clone());
            median_out[i] = med;
            mad_out[i] = compute_mad(&column, med);
        }
        Self {
            median: median_out,
            mad: mad_out,
        }
    }

    /// `(raw - median) / max(MAD, epsilon)`. Returns a new vector.
    pub fn scale(&self, raw: &ObjectiveVector, epsilon: f64) -> ObjectiveVector {
        let r = raw.to_array();
        let mut out = [0.0; OBJECTIVE_COUNT];
        for i in 0..OBJECTIVE_COUNT {
            out[i] = (r[i] - self.median[i]) / self.mad[i].max(epsilon);
        }
        ObjectiveVector::from_array(out)
    }

    pub fn unscale(&self, scaled: &ObjectiveVector, epsilon: f64) -> ObjectiveVector {
        let s = scaled.to_array();
        let mut out = [0.0; OBJECTIVE_COUNT];
        for i in 0..OBJECTIVE_COUNT {
            out[i] = s[i] * self.mad[i].max(epsilon) + self.median[i];
        }
        ObjectiveVector::from_array(out)
    }

    /// Objectives whose MAD sits on the epsilon floor.
    pub fn degenerate_count(&self, epsilon: f64) -> usize {
        self.mad.iter().filter(|m| **m < epsilon).count()
    }
}

/// Owns the scaling statistics across depths.
#[derive(Clone, Debug)]
pub struct Normalizer {
    mode: NormalizationMode,
    epsilon: f64,
    samples: Vec<ObjectiveVector>,
    stats: NormalizationStats,
    frozen: bool,
}

impl Normalizer {
    pub fn new(mode: NormalizationMode, epsilon: f64) -> Self {
        Self {
            mode,
            epsilon,
            samples: Vec::new(),
            stats: NormalizationStats::default(),
            frozen: false,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Folds the raw vectors of `depth` into the statistics and returns the
    /// statistics to use for that depth. An empty batch changes nothing.
    pub fn observe(&mut self, depth: usize, batch: &[ObjectiveVector]) -> NormalizationStats {
        if batch.is_empty() {
            return self.stats;
        }
        match self.mode {
            NormalizationMode::Fixed { warmup_depth } => {
                if !self.frozen {
                    self.samples.extend_from_slice(batch);
                    self.stats = NormalizationStats::from_samples(&self.samples);
                    if depth >= warmup_depth {
                        self.frozen = true;
                        self.samples = Vec::new();
                    }
                }
            }
            NormalizationMode::Running => {
                self.stats = NormalizationStats::from_samples(batch);
            }
        }
        self.stats
    }

    pub fn scale_all(&self, raw: &[ObjectiveVector]) -> Vec<ObjectiveVector> {
        raw.iter().map(|v| self.stats.scale(v, self.epsilon)).collect()
    }
}
