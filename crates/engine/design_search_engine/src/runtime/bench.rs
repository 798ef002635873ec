use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::config::BenchConfig;
use crate::domain::RuleSet;
use crate::engine::statistics::{compute_mean, variance};
use crate::error::ConfigError;
use crate::runtime::search::SearchEngine;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchResult {
    pub depth: usize,
    pub beam_width: usize,
    pub warmup: usize,
    pub iterations: usize,
    pub mean_total_ms: f64,
    /// Population variance of per-run wall time.
    pub variance_total_ms: f64,
    pub mean_per_depth_ms: f64,
    pub lambda_final_mean: f64,
}

/// Warmup runs (discarded) then measured runs. Run `i` of each phase uses
/// seed `seed + i`.
pub fn run_bench(config: &BenchConfig, rules: &RuleSet) -> Result<BenchResult, ConfigError> {
    config.validate()?;
    let engine_for = |i: usize| {
        let mut run = config.run.clone();
        run.seed = run.seed.wrapping_add(i as u64);
        SearchEngine::new(run, rules.clone())
    };

    for i in 0..config.warmup {
        let _ = engine_for(i)?.run();
    }

    let mut totals = Vec::with_capacity(config.iterations);
    let mut per_depth = Vec::with_capacity(config.iterations);
    let mut lambdas = Vec::with_capacity(config.iterations);
    for i in 0..config.iterations {
        let engine = engine_for(i)?;
        let start = Instant::now();
        let report = engine.run();
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        totals.push(ms);
        per_depth.push(ms / report.depths_completed.max(1) as f64);
        lambdas.push(report.final_lambda);
    }

    let result = BenchResult {
        depth: config.run.depth,
        beam_width: config.run.beam_width,
        warmup: config.warmup,
        iterations: config.iterations,
        mean_total_ms: compute_mean(&totals),
        variance_total_ms: variance(&totals),
        mean_per_depth_ms: compute_mean(&per_depth),
        lambda_final_mean: compute_mean(&lambdas),
    };
    info!(
        iterations = result.iterations,
        mean_total_ms = result.mean_total_ms,
        "bench finished"
    );
    Ok(result)
}
