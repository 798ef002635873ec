use core_types::ObjectiveWeights;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CACHE_CAPACITY: usize = 50_000;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BalanceMode {
    Off,
    /// At least `m` retained children per category present at this depth.
    Hard { m: usize },
    Soft { alpha: f64, temperature: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Statistics accumulate over depths `1..=warmup_depth`, then freeze.
    Fixed { warmup_depth: usize },
    /// Statistics recomputed from each depth's scored candidates.
    Running,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub depth: usize,
    pub beam_width: usize,
    pub balance: BalanceMode,
    /// Added uniformly to every soft-mode `S_final`, so it shifts scores
    /// without changing which children are retained. Unused by off and hard.
    pub entropy_beta: f64,
    /// Starting lambda. Defaults to the midpoint of `[lambda_min, lambda_max]`.
    pub lambda_init: Option<f64>,
    pub lambda_min: f64,
    pub lambda_max: f64,
    pub lambda_target_entropy: f64,
    pub lambda_k: f64,
    pub lambda_ema: f64,
    pub normalization: NormalizationMode,
    pub norm_epsilon: f64,
    pub field_enabled: bool,
    pub field_dimensions: usize,
    pub field_profile: bool,
    pub log_per_depth: bool,
    pub seed: u64,
    pub expansion_factor: usize,
    pub selection_pool_factor: usize,
    pub tiebreak_rank_threshold: usize,
    pub cache_capacity: usize,
    pub collapse_window: usize,
    pub legacy_collapse: bool,
    pub parallel_scoring: bool,
    pub deadline_ms: Option<u64>,
    pub weights: ObjectiveWeights,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            depth: 25,
            beam_width: 5,
            balance: BalanceMode::Off,
            entropy_beta: 0.0,
            lambda_init: None,
            lambda_min: 0.05,
            lambda_max: 1.0,
            lambda_target_entropy: 1.0,
            lambda_k: 0.05,
            lambda_ema: 0.2,
            normalization: NormalizationMode::Fixed { warmup_depth: 10 },
            norm_epsilon: 1e-9,
            field_enabled: true,
            field_dimensions: 64,
            field_profile: false,
            log_per_depth: true,
            seed: 42,
            expansion_factor: 5,
            selection_pool_factor: 4,
            tiebreak_rank_threshold: 2,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            collapse_window: 10,
            legacy_collapse: false,
            parallel_scoring: false,
            deadline_ms: None,
            weights: ObjectiveWeights::default(),
        }
    }
}

impl RunConfig {
    /// Validate every parameter. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_usize("depth", self.depth, 1, 1000, "1..=1000")?;
        check_usize("beam_width", self.beam_width, 1, 100, "1..=100")?;
        match self.balance {
            BalanceMode::Off => {}
            BalanceMode::Hard { m } => check_usize("balance.m", m, 1, 100, "1..=100")?,
            BalanceMode::Soft { alpha, temperature } => {
                check_f64("balance.alpha", alpha, 0.0, 50.0, "0..=50")?;
                check_f64("balance.temperature", temperature, 0.0, 100.0, "(0, 100]")?;
                if temperature <= 0.0 {
                    return Err(out_of_range("balance.temperature", temperature, "(0, 100]"));
                }
            }
        }
        check_f64("entropy_beta", self.entropy_beta, 0.0, 10.0, "0..=10")?;
        check_f64("lambda_min", self.lambda_min, 0.0, 1.0, "0..=1")?;
        check_f64("lambda_max", self.lambda_max, 0.0, 1.0, "0..=1")?;
        if self.lambda_min > self.lambda_max {
            return Err(ConfigError::Inconsistent(format!(
                "lambda_min {} exceeds lambda_max {}",
                self.lambda_min, self.lambda_max
            )));
        }
        if let Some(init) = self.lambda_init {
            check_f64("lambda_init", init, 0.0, 1.0, "0..=1")?;
            if init < self.lambda_min || init > self.lambda_max {
                return Err(ConfigError::Inconsistent(format!(
                    "lambda_init {} is outside [{}, {}]",
                    init, self.lambda_min, self.lambda_max
                )));
            }
        }
        check_f64(
            "lambda_target_entropy",
            self.lambda_target_entropy,
            0.0,
            10.0,
            "0..=10",
        )?;
        check_f64("lambda_k", self.lambda_k, 0.0, 10.0, "0..=10")?;
        check_f64("lambda_ema", self.lambda_ema, 0.0, 1.0, "(0, 1]")?;
        if self.lambda_ema <= 0.0 {
            return Err(out_of_range("lambda_ema", self.lambda_ema, "(0, 1]"));
        }
        if let NormalizationMode::Fixed { warmup_depth } = self.normalization {
            check_usize(
                "normalization.warmup_depth",
                warmup_depth,
                1,
                1000,
                "1..=1000",
            )?;
        }
        check_f64("norm_epsilon", self.norm_epsilon, 0.0, 1e-3, "(0, 1e-3]")?;
        if self.norm_epsilon <= 0.0 {
            return Err(out_of_range("norm_epsilon", self.norm_epsilon, "(0, 1e-3]"));
        }
        check_usize(
            "field_dimensions",
            self.field_dimensions,
            1,
            field_engine::MAX_DIMENSIONS,
            "1..=1024",
        )?;
        check_usize("expansion_factor", self.expansion_factor, 1, 100, "1..=100")?;
        check_usize(
            "selection_pool_factor",
            self.selection_pool_factor,
            1,
            100,
            "1..=100",
        )?;
        check_usize(
            "tiebreak_rank_threshold",
            self.tiebreak_rank_threshold,
            0,
            1000,
            "0..=1000",
        )?;
        check_usize(
            "cache_capacity",
            self.cache_capacity,
            1,
            10_000_000,
            "1..=10000000",
        )?;
        check_usize("collapse_window", self.collapse_window, 1, 1000, "1..=1000")?;
        if self.deadline_ms == Some(0) {
            return Err(out_of_range("deadline_ms", 0, "1.."));
        }
        self.validate_weights()
    }

    fn validate_weights(&self) -> Result<(), ConfigError> {
        let names = [
            "weights.cost",
            "weights.performance",
            "weights.reliability",
            "weights.structure",
            "weights.field",
        ];
        for (name, w) in names.into_iter().zip(self.weights.to_array()) {
            check_f64(name, w, 0.0, f64::MAX, "0..")?;
        }
        if self.weights.sum() <= 0.0 {
            return Err(ConfigError::Inconsistent(
                "objective weights are all zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn initial_lambda(&self) -> f64 {
        self.lambda_init.unwrap_or(0.5 * (self.lambda_min + self.lambda_max))
    }

    /// Number of children the balancer may retain per depth.
    pub fn generation_budget(&self) -> usize {
        self.beam_width * self.expansion_factor
    }

    pub fn selection_pool(&self) -> usize {
        self.beam_width * self.selection_pool_factor
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub run: RunConfig,
    pub warmup: usize,
    pub iterations: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            run: RunConfig::default(),
            warmup: 2,
            iterations: 5,
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.run.validate()?;
        check_usize("warmup", self.warmup, 0, 100, "0..=100")?;
        check_usize("iterations", self.iterations, 1, 1000, "1..=1000")
    }
}

fn out_of_range(
    field: &'static str,
    value: impl std::fmt::Display,
    range: &'static str,
) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value: value.to_string(),
        range,
    }
}

fn check_usize(
    field: &'static str,
    value: usize,
    min: usize,
    max: usize,
    range: &'static str,
) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(out_of_range(field, value, range));
    }
    Ok(())
}

fn check_f64(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
    range: &'static str,
) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field });
    }
    if value < min || value > max {
        return Err(out_of_range(field, value, range));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(RunConfig::default().validate(), Ok(()));
        assert_eq!(BenchConfig::default().validate(), Ok(()));
    }

    #[test]
    fn depth_and_beam_bounds_are_enforced() {
        let mut cfg = RunConfig::default();
        cfg.depth = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange { field: "depth", .. })
        ));
        cfg.depth = 1000;
        cfg.beam_width = 101;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange {
                field: "beam_width",
                ..
            })
        ));
    }

    #[test]
    fn non_finite_values_are_rejected_not_clamped() {
        let mut cfg = RunConfig::default();
        cfg.lambda_k = f64::NAN;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonFinite { field: "lambda_k" })
        );

        let mut cfg = RunConfig::default();
        cfg.balance = BalanceMode::Soft {
            alpha: f64::INFINITY,
            temperature: 1.0,
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonFinite {
                field: "balance.alpha"
            })
        );
    }

    #[test]
    fn zero_temperature_and_zero_ema_are_rejected() {
        let mut cfg = RunConfig::default();
        cfg.balance = BalanceMode::Soft {
            alpha: 1.0,
            temperature: 0.0,
        };
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::default();
        cfg.lambda_ema = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn lambda_bounds_must_be_consistent() {
        let mut cfg = RunConfig::default();
        cfg.lambda_min = 0.8;
        cfg.lambda_max = 0.4;
        assert!(matches!(cfg.validate(), Err(ConfigError::Inconsistent(_))));

        let mut cfg = RunConfig::default();
        cfg.lambda_init = Some(0.01);
        assert!(matches!(cfg.validate(), Err(ConfigError::Inconsistent(_))));
    }

    #[test]
    fn default_lambda_init_follows_the_bounds() {
        let mut cfg = RunConfig::default();
        cfg.lambda_min = 0.6;
        assert_eq!(cfg.validate(), Ok(()));
        assert!((cfg.initial_lambda() - 0.8).abs() < 1e-12);

        cfg.lambda_min = 0.05;
        cfg.lambda_max = 0.3;
        assert_eq!(cfg.validate(), Ok(()));
        assert!((cfg.initial_lambda() - 0.175).abs() < 1e-12);

        cfg.lambda_init = Some(0.2);
        assert_eq!(cfg.initial_lambda(), 0.2);
    }

    #[test]
    fn weights_must_not_all_be_zero() {
        let mut cfg = RunConfig::default();
        cfg.weights = ObjectiveWeights {
            cost: 0.0,
            performance: 0.0,
            reliability: 0.0,
            structure: 0.0,
            field: 0.0,
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Inconsistent(_))));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{"depth": 7, "balance": {"mode": "soft", "alpha": 3.0, "temperature": 0.7},
                "normalization": {"mode": "running"}}"#,
        )
        .expect("config parses");
        assert_eq!(cfg.depth, 7);
        assert_eq!(cfg.beam_width, 5);
        assert_eq!(
            cfg.balance,
            BalanceMode::Soft {
                alpha: 3.0,
                temperature: 0.7
            }
        );
        assert_eq!(cfg.normalization, NormalizationMode::Running);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn bench_bounds_are_enforced() {
        let mut cfg = BenchConfig::default();
        cfg.iterations = 0;
        assert!(cfg.validate().is_err());
        cfg.iterations = 1;
        cfg.warmup = 101;
        assert!(cfg.validate().is_err());
    }
}
