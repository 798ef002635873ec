use std::convert::Infallible;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use core_types::ObjectiveVector;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::capability::{
    BalanceItem, BeamFrontier, BeamSelector, CandidateGenerator, CategoryBalancer,
    CollapseDetector, LambdaController, LambdaState, format_category_counts,
    frontier_category_entropy,
};
use crate::config::RunConfig;
use crate::domain::{DesignState, RuleSet};
use crate::engine::pareto::{hv_2d, median_nn_dist, spacing};
use crate::engine::{
    Normalizer, ObjectiveModel, ProjectionCache, RankKey, pareto_ranks, rank_order,
};
use crate::error::{ConfigError, EngineError};
use crate::ports::TraceSink;
use crate::runtime::trace::TraceRow;

pub const ROOT_NODE_COUNT: u32 = 6;
pub const ROOT_EDGE_COUNT: u32 = 5;

/// Everything that survives from one depth to the next besides the frontier.
#[derive(Clone, Debug)]
pub struct SearchCarry {
    pub lambda: LambdaState,
    pub normalizer: Normalizer,
    pub collapse: CollapseDetector,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Completed,
    /// The frontier produced no children.
    Exhausted,
    Deadline,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DepthOutcome {
    pub frontier: BeamFrontier,
    pub row: TraceRow,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub rows: Vec<TraceRow>,
    pub frontier: BeamFrontier,
    pub stop_reason: StopReason,
    pub depths_completed: usize,
    pub final_lambda: f64,
}

impl RunReport {
    pub fn emit_to(&self, sink: &mut dyn TraceSink) -> Result<(), EngineError> {
        for row in &self.rows {
            sink.emit(row)?;
        }
        sink.finish()
    }
}

pub struct SearchEngine {
    config: RunConfig,
    rules: RuleSet,
    model: ObjectiveModel,
    lambda: LambdaController,
    root: DesignState,
    cache: Mutex<ProjectionCache>,
}

impl SearchEngine {
    /// Validates `config` and `rules`; no search state exists until this succeeds.
    pub fn new(config: RunConfig, rules: RuleSet) -> Result<Self, ConfigError> {
        config.validate()?;
        rules.validate()?;
        let model = ObjectiveModel::new(
            config.weights,
            config.field_enabled.then_some(config.field_dimensions),
            &rules.categories(),
        )?;
        let root = DesignState::root(config.seed, ROOT_NODE_COUNT, ROOT_EDGE_COUNT);
        let lambda = LambdaController::from_config(&config);
        let cache = Mutex::new(ProjectionCache::new(config.cache_capacity));
        Ok(Self {
            config,
            rules,
            model,
            lambda,
            root,
            cache,
        })
    }

    pub fn with_root(mut self, root: DesignState) -> Self {
        self.root = root;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn model(&self) -> &ObjectiveModel {
        &self.model
    }

    pub fn initial_frontier(&self) -> BeamFrontier {
        BeamFrontier::root(self.root.clone())
    }

    pub fn initial_carry(&self) -> SearchCarry {
        SearchCarry {
            lambda: self.lambda.initial_state(self.config.initial_lambda()),
            normalizer: Normalizer::new(self.config.normalization, self.config.norm_epsilon),
            collapse: CollapseDetector::new(
                self.config.collapse_window,
                self.config.legacy_collapse,
            ),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn reset_cache(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// One depth: generate, balance, score, normalize, rank, select, observe.
    /// Cross-depth state lives in `carry` only.
    pub fn step_depth(
        &self,
        depth: usize,
        frontier: &BeamFrontier,
        carry: &mut SearchCarry,
    ) -> DepthOutcome {
        let cfg = &self.config;
        let t_total = Instant::now();

        let t_gen = Instant::now();
        let generation = CandidateGenerator::new(&self.rules).generate(frontier.states());
        let cheap: Vec<ObjectiveVector> = if cfg.parallel_scoring {
            generation.children.par_iter().map(|s| self.model.cheap(s)).collect()
        } else {
            generation.children.iter().map(|s| self.model.cheap(s)).collect()
        };
        let items: Vec<BalanceItem> = generation
            .children
            .iter()
            .zip(generation.categories.iter())
            .zip(cheap.iter())
            .map(|((state, category), v)| BalanceItem {
                id: state.id,
                category: *category,
                base_score: self.model.base_score(v),
            })
            .collect();
        let balance = CategoryBalancer::new(cfg.balance, cfg.generation_budget(), cfg.entropy_beta)
            .apply(&items);
        let retained: Vec<&DesignState> = balance
            .retained
            .iter()
            .map(|i| &generation.children[*i])
            .collect();
        let retained_cheap: Vec<ObjectiveVector> =
            balance.retained.iter().map(|i| cheap[*i]).collect();
        let generation_us = elapsed_us(t_gen);

        let t_score = Instant::now();
        let scored = self
            .model
            .complete_batch(&retained, retained_cheap, &self.cache, cfg.parallel_scoring);
        let scoring_us = elapsed_us(t_score);

        let t_agg = Instant::now();
        let stats = carry.normalizer.observe(depth, &scored.vectors);
        let scaled = carry.normalizer.scale_all(&scored.vectors);
        let ranks = pareto_ranks(&scaled);
        let keys: Vec<RankKey> = retained
            .iter()
            .enumerate()
            .map(|(i, state)| RankKey {
                rank: ranks[i],
                total_score: self.model.total_score(&scaled[i]),
                structural_quality: -scaled[i].structure,
                id: state.id,
            })
            .collect();
        let order = rank_order(&keys, cfg.tiebreak_rank_threshold);

        let lambda_used = carry.lambda.value;
        let picks = BeamSelector::new(cfg.beam_width, cfg.selection_pool()).select(
            &order,
            &scaled,
            lambda_used,
        );
        let next = BeamFrontier::from_ordered(
            picks.iter().map(|i| retained[*i].clone()),
            cfg.beam_width,
        );

        let frontier_scaled: Vec<ObjectiveVector> = picks.iter().map(|i| scaled[*i]).collect();
        let pareto_front_size = picks.iter().filter(|i| ranks[**i] == 0).count();
        let pareto_rank0_total = ranks.iter().filter(|r| **r == 0).count();
        let (category_entropy, counts) = frontier_category_entropy(next.states());
        let delta_lambda = self.lambda.update(&mut carry.lambda, category_entropy);
        let verdict = carry.collapse.observe(&frontier_scaled, pareto_front_size);
        let aggregation_us = elapsed_us(t_agg);
        let total_us = elapsed_us(t_total);

        let profile = |us: f64| if cfg.field_profile { us } else { 0.0 };
        let row = TraceRow {
            depth,
            candidate_count: generation.children.len(),
            retained_count: retained.len(),
            frontier_size: next.len(),
            pareto_front_size,
            pareto_rank0_total,
            lambda: lambda_used,
            delta_lambda,
            category_entropy,
            unique_category_count: counts.len(),
            per_category: format_category_counts(&counts),
            mean_nn_dist: verdict.nn_dist,
            median_nn_dist: median_nn_dist(&frontier_scaled),
            median_nn_window: verdict.reference,
            spacing: spacing(&frontier_scaled),
            hv_2d: hv_2d(&frontier_scaled),
            collapse_flag: verdict.collapse,
            legacy_collapse_flag: verdict.legacy_collapse,
            norm_median: stats.median,
            norm_mad: stats.mad,
            norm_mad_zero_count: stats.degenerate_count(carry.normalizer.epsilon()),
            norm_frozen: carry.normalizer.is_frozen(),
            cache_hits: scored.cache_hits,
            cache_misses: scored.cache_misses,
            cache_len: self.cache_len(),
            generation_us: profile(generation_us),
            scoring_us: profile(scoring_us),
            aggregation_us: profile(aggregation_us),
            total_us: profile(total_us),
        };
        debug!(
            depth,
            candidates = row.candidate_count,
            frontier = row.frontier_size,
            lambda = row.lambda,
            collapse = row.collapse_flag,
            "depth committed"
        );
        DepthOutcome { frontier: next, row }
    }

    /// Runs to the configured depth, a deadline, or an empty frontier.
    /// The projection cache starts empty on every run.
    pub fn run(&self) -> RunReport {
        match self.drive(|_| Ok::<(), Infallible>(())) {
            Ok(report) => report,
            Err(never) => match never {},
        }
    }

    /// Like `run`, additionally streaming rows into `sink` as they are
    /// committed. With `log_per_depth` off only the final row is emitted.
    pub fn run_with_sink(&self, sink: &mut dyn TraceSink) -> Result<RunReport, EngineError> {
        let report = self.drive(|row| sink.emit(row))?;
        sink.finish()?;
        Ok(report)
    }

    fn drive<E>(&self, mut emit: impl FnMut(&TraceRow) -> Result<(), E>) -> Result<RunReport, E> {
        self.reset_cache();
        let deadline = self
            .config
            .deadline_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));
        let mut carry = self.initial_carry();
        let mut frontier = self.initial_frontier();
        let mut rows = Vec::new();
        let mut stop_reason = StopReason::Completed;
        let mut depths_completed = 0usize;

        for depth in 1..=self.config.depth {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(depth, "deadline reached, stopping early");
                stop_reason = StopReason::Deadline;
                break;
            }
            let outcome = self.step_depth(depth, &frontier, &mut carry);
            depths_completed = depth;
            frontier = outcome.frontier;
            if self.config.log_per_depth {
                emit(&outcome.row)?;
            } else {
                rows.clear();
            }
            rows.push(outcome.row);
            if frontier.is_empty() {
                stop_reason = StopReason::Exhausted;
                break;
            }
        }
        if !self.config.log_per_depth {
            if let Some(last) = rows.last() {
                emit(last)?;
            }
        }

        info!(
            depths_completed,
            stop_reason = ?stop_reason,
            lambda = carry.lambda.value,
            "search finished"
        );
        Ok(RunReport {
            rows,
            frontier,
            stop_reason,
            depths_completed,
            final_lambda: carry.lambda.value,
        })
    }
}

fn elapsed_us(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BalanceMode, NormalizationMode};

    fn engine(config: RunConfig) -> SearchEngine {
        SearchEngine::new(config, RuleSet::default_catalogue()).expect("valid engine")
    }

    #[test]
    fn invalid_config_is_rejected_before_any_state() {
        let mut cfg = RunConfig::default();
        cfg.beam_width = 0;
        assert!(SearchEngine::new(cfg, RuleSet::default_catalogue()).is_err());
        assert!(SearchEngine::new(RunConfig::default(), RuleSet::default()).is_err());
    }

    #[test]
    fn step_depth_is_a_function_of_frontier_and_carry() {
        let e = engine(RunConfig::default());
        let frontier = e.initial_frontier();
        let mut carry_a = e.initial_carry();
        let mut carry_b = e.initial_carry();
        let a = e.step_depth(1, &frontier, &mut carry_a);
        let b = e.step_depth(1, &frontier, &mut carry_b);
        assert_eq!(a.frontier, b.frontier);
        assert_eq!(a.row.frontier_size, b.row.frontier_size);
        assert_eq!(carry_a.lambda, carry_b.lambda);
        assert!(b.row.cache_hits > 0, "second step should reuse projections");
    }

    #[test]
    fn final_only_mode_keeps_last_row() {
        let mut cfg = RunConfig::default();
        cfg.depth = 6;
        cfg.log_per_depth = false;
        let report = engine(cfg).run();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].depth, 6);
    }

    #[test]
    fn frontier_respects_beam_width_every_depth() {
        let mut cfg = RunConfig::default();
        cfg.depth = 12;
        cfg.beam_width = 4;
        cfg.balance = BalanceMode::Hard { m: 2 };
        cfg.normalization = NormalizationMode::Running;
        let e = engine(cfg);
        let mut carry = e.initial_carry();
        let mut frontier = e.initial_frontier();
        for depth in 1..=12 {
            let out = e.step_depth(depth, &frontier, &mut carry);
            assert!(out.frontier.len() <= 4);
            let mut ids = out.frontier.ids();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), out.frontier.len());
            assert!(out.frontier.states().iter().all(|s| s.depth == depth));
            frontier = out.frontier;
        }
    }

    #[test]
    fn field_off_keeps_cache_empty() {
        let mut cfg = RunConfig::default();
        cfg.depth = 4;
        cfg.field_enabled = false;
        let e = engine(cfg);
        let report = e.run();
        assert_eq!(e.cache_len(), 0);
        assert!(report.rows.iter().all(|r| r.cache_hits == 0 && r.cache_misses == 0));
    }

    #[test]
    fn exhausted_rules_stop_the_run() {
        use crate::domain::{DesignRule, Transformation};
        use core_types::RuleCategory;

        let rules = RuleSet::new(vec![DesignRule::new(
            1,
            "relax",
            RuleCategory::ConstraintPropagation,
            1.0,
            Transformation::RelaxConstraint,
        )]);
        let mut cfg = RunConfig::default();
        cfg.depth = 5;
        let report = SearchEngine::new(cfg, rules).expect("valid engine").run();
        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert_eq!(report.depths_completed, 1);
        assert!(report.frontier.is_empty());
        assert_eq!(report.rows[0].candidate_count, 0);
    }
}
