use core_types::OBJECTIVE_COUNT;
use serde::Serialize;

/// Per-depth diagnostics. Emitted outward only; the search never reads it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TraceRow {
    pub depth: usize,
    pub candidate_count: usize,
    pub retained_count: usize,
    pub frontier_size: usize,
    pub pareto_front_size: usize,
    pub pareto_rank0_total: usize,
    /// Value used to pick this depth's frontier.
    pub lambda: f64,
    /// Change committed after this depth.
    pub delta_lambda: f64,
    pub category_entropy: f64,
    pub unique_category_count: usize,
    pub per_category: String,
    pub mean_nn_dist: f64,
    pub median_nn_dist: f64,
    pub median_nn_window: f64,
    pub spacing: f64,
    pub hv_2d: f64,
    pub collapse_flag: bool,
    pub legacy_collapse_flag: bool,
    pub norm_median: [f64; OBJECTIVE_COUNT],
    pub norm_mad: [f64; OBJECTIVE_COUNT],
    pub norm_mad_zero_count: usize,
    pub norm_frozen: bool,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub cache_len: usize,
    pub generation_us: f64,
    pub scoring_us: f64,
    pub aggregation_us: f64,
    pub total_us: f64,
}

pub const CSV_HEADER: &str = concat!(
    "depth,candidate_count,retained_count,frontier_size,pareto_front_size,",
    "pareto_rank0_total,lambda,delta_lambda,category_entropy,unique_category_count,",
    "per_category,mean_nn_dist,median_nn_dist,median_nn_window,spacing,hv_2d,",
    "collapse_flag,legacy_collapse_flag,norm_median_0,norm_median_1,norm_median_2,",
    "norm_median_3,norm_median_4,norm_mad_0,norm_mad_1,norm_mad_2,norm_mad_3,",
    "norm_mad_4,norm_mad_zero_count,norm_frozen,cache_hits,cache_misses,cache_len,",
    "generation_us,scoring_us,aggregation_us,total_us",
);

impl TraceRow {
    pub fn to_csv_line(&self) -> String {
        let mut fields: Vec<String> = vec![
            self.depth.to_string(),
            self.candidate_count.to_string(),
            self.retained_count.to_string(),
            self.frontier_size.to_string(),
            self.pareto_front_size.to_string(),
            self.pareto_rank0_total.to_string(),
            self.lambda.to_string(),
            self.delta_lambda.to_string(),
            self.category_entropy.to_string(),
            self.unique_category_count.to_string(),
            self.per_category.clone(),
            self.mean_nn_dist.to_string(),
            self.median_nn_dist.to_string(),
            self.median_nn_window.to_string(),
            self.spacing.to_string(),
            self.hv_2d.to_string(),
            self.collapse_flag.to_string(),
            self.legacy_collapse_flag.to_string(),
        ];
        fields.extend(self.norm_median.iter().map(|v| v.to_string()));
        fields.extend(self.norm_mad.iter().map(|v| v.to_string()));
        fields.extend([
            self.norm_mad_zero_count.to_string(),
            self.norm_frozen.to_string(),
            self.cache_hits.to_string(),
            self.cache_misses.to_string(),
            self.cache_len.to_string(),
            self.generation_us.to_string(),
            self.scoring_us.to_string(),
            self.aggregation_us.to_string(),
            self.total_us.to_string(),
        ]);
        fields.join(",")
    }
}
