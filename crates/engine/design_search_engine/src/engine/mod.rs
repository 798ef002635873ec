pub mod cache;
pub mod normalization;
pub mod objective;
pub mod pareto;
pub mod statistics;

pub use cache::BoundedProjectionCache;
pub use normalization::{NormalizationStats, Normalizer};
pub use objective::{FIELD_NEUTRAL, ObjectiveModel, ProjectionCache, ScoredBatch};
pub use pareto::{RankKey, compare_rank_keys, dominates, pareto_ranks, rank_order};
